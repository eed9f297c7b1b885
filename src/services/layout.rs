use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::db::models::{Question, QuizSection, QuizSlot};

/// Slot numbers grouped by section, in presentation order.
#[derive(Debug, Clone)]
pub struct SectionSlots {
    pub shuffle: bool,
    pub slots: Vec<i32>,
}

/// Splits the quiz's slot list at the section boundaries. A quiz with no
/// section rows behaves as a single fixed-order section.
pub fn section_slot_groups(sections: &[QuizSection], slots: &[QuizSlot]) -> Vec<SectionSlots> {
    let slot_numbers: Vec<i32> = slots.iter().map(|slot| slot.slot).collect();
    if sections.is_empty() {
        return vec![SectionSlots { shuffle: false, slots: slot_numbers }];
    }

    let mut groups = Vec::with_capacity(sections.len());
    for (index, section) in sections.iter().enumerate() {
        let upper = sections.get(index + 1).map(|next| next.first_slot).unwrap_or(i32::MAX);
        let members: Vec<i32> = slot_numbers
            .iter()
            .copied()
            .filter(|slot| *slot >= section.first_slot && *slot < upper)
            .collect();
        groups.push(SectionSlots { shuffle: section.shuffle, slots: members });
    }
    groups
}

/// Builds the attempt layout: slot numbers in section order (shuffled
/// sections permuted), with a 0 page-break token closing every page of
/// `questions_per_page` slots. `questions_per_page <= 0` puts everything on
/// one page.
pub fn build_layout(
    groups: &[SectionSlots],
    questions_per_page: i32,
    rng: &mut impl Rng,
) -> Vec<i32> {
    let mut ordered = Vec::new();
    for group in groups {
        let mut slots = group.slots.clone();
        if group.shuffle {
            slots.shuffle(rng);
        }
        ordered.extend(slots);
    }

    if ordered.is_empty() {
        return Vec::new();
    }

    let per_page = if questions_per_page > 0 { questions_per_page as usize } else { ordered.len() };
    let mut layout = Vec::with_capacity(ordered.len() + ordered.len() / per_page + 1);
    for (index, slot) in ordered.iter().enumerate() {
        layout.push(*slot);
        if (index + 1) % per_page == 0 {
            layout.push(0);
        }
    }
    if layout.last() != Some(&0) {
        layout.push(0);
    }
    layout
}

pub fn format_layout(tokens: &[i32]) -> String {
    tokens.iter().map(|token| token.to_string()).collect::<Vec<_>>().join(",")
}

pub fn parse_layout(layout: &str) -> Vec<i32> {
    layout
        .split(',')
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse().ok())
        .collect()
}

pub fn page_count(layout: &str) -> i32 {
    parse_layout(layout).iter().filter(|token| **token == 0).count() as i32
}

/// Last valid page index; an empty layout still has page 0.
pub fn last_page(layout: &str) -> i32 {
    (page_count(layout) - 1).max(0)
}

pub fn slots_on_page(layout: &str, page: i32) -> Vec<i32> {
    let mut current = 0;
    let mut slots = Vec::new();
    for token in parse_layout(layout) {
        if token == 0 {
            if current == page {
                return slots;
            }
            current += 1;
            slots.clear();
        } else if current == page {
            slots.push(token);
        }
    }
    slots
}

/// Picks a question for a random slot: candidates must carry every required
/// tag; questions this user has already seen are avoided while any fresh
/// candidate remains. Returns `None` when the filtered pool is empty.
pub fn select_random_question(
    candidates: &[Question],
    required_tags: &[String],
    used: &HashSet<String>,
    rng: &mut impl Rng,
) -> Option<String> {
    let eligible: Vec<&Question> = candidates
        .iter()
        .filter(|question| required_tags.iter().all(|tag| question.tags.0.contains(tag)))
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let fresh: Vec<&&Question> =
        eligible.iter().filter(|question| !used.contains(&question.id)).collect();

    if fresh.is_empty() {
        eligible.choose(rng).map(|question| question.id.clone())
    } else {
        fresh.choose(rng).map(|question| question.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sqlx::types::Json;

    fn question(id: &str, tags: &[&str]) -> Question {
        Question {
            id: id.to_string(),
            category_id: "cat-1".to_string(),
            name: id.to_string(),
            tags: Json(tags.iter().map(|tag| tag.to_string()).collect()),
            default_mark: 1.0,
        }
    }

    fn fixed_groups(count: i32) -> Vec<SectionSlots> {
        vec![SectionSlots { shuffle: false, slots: (1..=count).collect() }]
    }

    #[test]
    fn layout_has_n_slots_and_ceil_n_over_p_breaks() {
        let mut rng = StdRng::seed_from_u64(7);
        for (n, p) in [(7, 3), (6, 3), (1, 1), (5, 2), (4, 10)] {
            let layout = build_layout(&fixed_groups(n), p, &mut rng);
            let slots: Vec<i32> = layout.iter().copied().filter(|token| *token != 0).collect();
            let breaks = layout.iter().filter(|token| **token == 0).count() as i32;
            assert_eq!(slots, (1..=n).collect::<Vec<_>>(), "n={n} p={p}");
            assert_eq!(breaks, (n + p - 1) / p, "n={n} p={p}");
        }
    }

    #[test]
    fn zero_questions_per_page_means_single_page() {
        let mut rng = StdRng::seed_from_u64(7);
        let layout = build_layout(&fixed_groups(5), 0, &mut rng);
        assert_eq!(layout, vec![1, 2, 3, 4, 5, 0]);
    }

    #[test]
    fn empty_quiz_has_empty_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(build_layout(&[], 1, &mut rng).is_empty());
    }

    #[test]
    fn shuffled_section_keeps_membership() {
        let mut rng = StdRng::seed_from_u64(42);
        let groups = vec![
            SectionSlots { shuffle: false, slots: vec![1, 2] },
            SectionSlots { shuffle: true, slots: vec![3, 4, 5] },
        ];
        let layout = build_layout(&groups, 10, &mut rng);
        let slots: Vec<i32> = layout.iter().copied().filter(|token| *token != 0).collect();
        assert_eq!(&slots[..2], &[1, 2]);
        let mut tail: Vec<i32> = slots[2..].to_vec();
        tail.sort_unstable();
        assert_eq!(tail, vec![3, 4, 5]);
    }

    #[test]
    fn format_and_parse_round_trip() {
        let tokens = vec![3, 1, 0, 2, 0];
        assert_eq!(parse_layout(&format_layout(&tokens)), tokens);
    }

    #[test]
    fn pages_are_addressable() {
        let layout = "1,2,0,3,4,0,5,0";
        assert_eq!(page_count(layout), 3);
        assert_eq!(last_page(layout), 2);
        assert_eq!(slots_on_page(layout, 0), vec![1, 2]);
        assert_eq!(slots_on_page(layout, 1), vec![3, 4]);
        assert_eq!(slots_on_page(layout, 2), vec![5]);
        assert!(slots_on_page(layout, 3).is_empty());
    }

    #[test]
    fn random_selection_avoids_used_questions() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = vec![question("a", &[]), question("b", &[])];
        let used: HashSet<String> = ["a".to_string()].into_iter().collect();
        for _ in 0..20 {
            let picked = select_random_question(&candidates, &[], &used, &mut rng);
            assert_eq!(picked.as_deref(), Some("b"));
        }
    }

    #[test]
    fn random_selection_reuses_when_pool_exhausted() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = vec![question("a", &[])];
        let used: HashSet<String> = ["a".to_string()].into_iter().collect();
        let picked = select_random_question(&candidates, &[], &used, &mut rng);
        assert_eq!(picked.as_deref(), Some("a"));
    }

    #[test]
    fn random_selection_honors_tags() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = vec![question("a", &["easy"]), question("b", &["hard"])];
        let required = vec!["hard".to_string()];
        let picked = select_random_question(&candidates, &required, &HashSet::new(), &mut rng);
        assert_eq!(picked.as_deref(), Some("b"));

        let required = vec!["impossible".to_string()];
        assert!(select_random_question(&candidates, &required, &HashSet::new(), &mut rng)
            .is_none());
    }
}
