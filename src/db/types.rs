use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gradingmethod", rename_all = "lowercase")]
pub enum GradingMethod {
    Highest,
    Average,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "overduehandling", rename_all = "lowercase")]
pub enum OverdueHandling {
    Autosubmit,
    Graceperiod,
    Autoabandon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attemptstate", rename_all = "lowercase")]
pub enum AttemptState {
    Inprogress,
    Overdue,
    Finished,
    Abandoned,
}

impl AttemptState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Finished | AttemptState::Abandoned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "navigationmethod", rename_all = "lowercase")]
pub enum NavigationMethod {
    Free,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "browsersecurity", rename_all = "lowercase")]
pub enum BrowserSecurity {
    None,
    Securewindow,
}
