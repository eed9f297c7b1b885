use std::net::IpAddr;

use crate::access::rule::{AccessRule, RuleContext};

/// Restricts access to a list of subnets: full addresses, CIDR blocks, or
/// dotted prefixes, comma separated.
pub struct IpAddressRule {
    subnet: String,
    remote_addr: Option<IpAddr>,
}

pub fn make(ctx: &RuleContext<'_>) -> Option<Box<dyn AccessRule>> {
    let subnet = ctx.quiz.subnet.as_deref()?.trim();
    if subnet.is_empty() {
        return None;
    }
    Some(Box::new(IpAddressRule { subnet: subnet.to_string(), remote_addr: ctx.remote_addr }))
}

impl AccessRule for IpAddressRule {
    fn name(&self) -> &'static str {
        "ip_address"
    }

    fn prevent_access(&self) -> Option<String> {
        let Some(addr) = self.remote_addr else {
            return Some(
                "This quiz is restricted by network address, which could not be determined"
                    .to_string(),
            );
        };
        if address_in_subnet(addr, &self.subnet) {
            None
        } else {
            Some("This quiz can only be taken from certain network locations".to_string())
        }
    }
}

/// Checks the address against a comma-separated subnet list. Entries may be
/// exact addresses, CIDR blocks (v4 or v6), or partial dotted v4 prefixes
/// such as `192.168.`.
pub fn address_in_subnet(addr: IpAddr, subnet_list: &str) -> bool {
    subnet_list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .any(|entry| matches_entry(addr, entry))
}

fn matches_entry(addr: IpAddr, entry: &str) -> bool {
    if let Some((network, bits)) = entry.split_once('/') {
        let Ok(prefix) = bits.parse::<u32>() else {
            return false;
        };
        let Ok(network) = network.parse::<IpAddr>() else {
            return false;
        };
        return cidr_match(addr, network, prefix);
    }

    if let Ok(exact) = entry.parse::<IpAddr>() {
        return addr == exact;
    }

    // Partial dotted prefix; "192.168" and "192.168." both match 192.168.0.0/16.
    let prefix =
        if entry.ends_with('.') { entry.to_string() } else { format!("{entry}.") };
    addr.to_string().starts_with(&prefix)
}

fn cidr_match(addr: IpAddr, network: IpAddr, prefix: u32) -> bool {
    match (addr, network) {
        (IpAddr::V4(addr), IpAddr::V4(network)) => {
            if prefix == 0 {
                return true;
            }
            if prefix > 32 {
                return false;
            }
            let mask = u32::MAX << (32 - prefix);
            u32::from(addr) & mask == u32::from(network) & mask
        }
        (IpAddr::V6(addr), IpAddr::V6(network)) => {
            if prefix == 0 {
                return true;
            }
            if prefix > 128 {
                return false;
            }
            let mask = u128::MAX << (128 - prefix);
            u128::from(addr) & mask == u128::from(network) & mask
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(addr: &str) -> IpAddr {
        addr.parse().unwrap()
    }

    #[test]
    fn exact_address_matches() {
        assert!(address_in_subnet(v4("10.0.0.5"), "10.0.0.5"));
        assert!(!address_in_subnet(v4("10.0.0.6"), "10.0.0.5"));
    }

    #[test]
    fn cidr_blocks_match_by_prefix() {
        assert!(address_in_subnet(v4("192.168.4.7"), "192.168.4.0/24"));
        assert!(!address_in_subnet(v4("192.168.5.7"), "192.168.4.0/24"));
        assert!(address_in_subnet(v4("172.16.99.1"), "172.16.0.0/12"));
    }

    #[test]
    fn dotted_prefixes_match() {
        assert!(address_in_subnet(v4("192.168.1.1"), "192.168."));
        assert!(address_in_subnet(v4("192.168.1.1"), "192.168"));
        assert!(!address_in_subnet(v4("192.169.1.1"), "192.168."));
    }

    #[test]
    fn any_entry_in_the_list_suffices() {
        let list = "10.0.0.0/8, 192.168.1.50";
        assert!(address_in_subnet(v4("10.1.2.3"), list));
        assert!(address_in_subnet(v4("192.168.1.50"), list));
        assert!(!address_in_subnet(v4("192.168.1.51"), list));
    }

    #[test]
    fn ipv6_cidr_matches() {
        let addr: IpAddr = "2001:db8::1".parse().unwrap();
        assert!(address_in_subnet(addr, "2001:db8::/32"));
        assert!(!address_in_subnet(addr, "2001:db9::/32"));
    }

    #[test]
    fn unknown_address_blocks_access() {
        let rule = IpAddressRule { subnet: "10.0.0.0/8".to_string(), remote_addr: None };
        assert!(rule.prevent_access().is_some());
    }
}
