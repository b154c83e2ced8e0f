//! VLAN encoding for port groups

use vc_shared_types::{ConnectionMode, NumericRange, VlanSpec};

use crate::error::VCenterError;
use crate::Result;

/// Highest VLAN id vSphere accepts on a port group
pub const MAX_VLAN_ID: u16 = 4094;

/// Host port group VLAN id meaning "all VLANs"
pub const HOST_TRUNK_VLAN_ID: u16 = 4095;

fn invalid(value: &str, reason: impl Into<String>) -> VCenterError {
    VCenterError::InvalidVlan {
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_vlan_id(raw: &str, whole: &str) -> Result<u16> {
    let id = raw
        .trim()
        .parse::<u16>()
        .map_err(|_| invalid(whole, format!("'{}' is not a number", raw.trim())))?;
    if id > MAX_VLAN_ID {
        return Err(invalid(whole, format!("{} is above {}", id, MAX_VLAN_ID)));
    }
    Ok(id)
}

fn parse_range(part: &str, whole: &str) -> Result<NumericRange> {
    let bounds: Vec<&str> = part.split('-').collect();
    match bounds.as_slice() {
        [single] => {
            let id = parse_vlan_id(single, whole)?;
            Ok(NumericRange { start: id, end: id })
        }
        [start, end] => {
            let start = parse_vlan_id(start, whole)?;
            let end = parse_vlan_id(end, whole)?;
            if start > end {
                return Err(invalid(whole, format!("range {}-{} is reversed", start, end)));
            }
            Ok(NumericRange { start, end })
        }
        _ => Err(invalid(whole, format!("'{}' is not a range", part))),
    }
}

/// Build the structural VLAN policy of a port group.
///
/// Access ports take a single id. Trunk ports take `start-end` ranges, a
/// bare `V` standing for `V-V`; several ranges are comma separated.
pub fn get_vlan_spec(port_mode: ConnectionMode, vlan_range: &str) -> Result<VlanSpec> {
    if vlan_range.trim().is_empty() {
        return Err(invalid(vlan_range, "VLAN id is empty"));
    }

    match port_mode {
        ConnectionMode::Access => Ok(VlanSpec::VlanId(parse_vlan_id(vlan_range, vlan_range)?)),
        ConnectionMode::Trunk => {
            let ranges = vlan_range
                .split(',')
                .map(|part| parse_range(part, vlan_range))
                .collect::<Result<Vec<_>>>()?;
            Ok(VlanSpec::Trunk(ranges))
        }
    }
}

/// VLAN id for a host (standard) port group, which has no range concept
pub fn host_vlan_id(spec: &VlanSpec) -> u16 {
    match spec {
        VlanSpec::VlanId(id) => *id,
        VlanSpec::Trunk(_) => HOST_TRUNK_VLAN_ID,
    }
}

/// Render a VLAN policy back to the orchestrator's textual form
pub fn vlan_spec_to_string(spec: &VlanSpec) -> String {
    match spec {
        VlanSpec::VlanId(id) => id.to_string(),
        VlanSpec::Trunk(ranges) => ranges
            .iter()
            .map(|range| {
                if range.start == range.end {
                    range.start.to_string()
                } else {
                    format!("{}-{}", range.start, range.end)
                }
            })
            .collect::<Vec<_>>()
            .join(","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_is_single_id() {
        assert_eq!(
            get_vlan_spec(ConnectionMode::Access, "100").unwrap(),
            VlanSpec::VlanId(100)
        );
        assert!(get_vlan_spec(ConnectionMode::Access, "100-200").is_err());
        assert!(get_vlan_spec(ConnectionMode::Access, "").is_err());
        assert!(get_vlan_spec(ConnectionMode::Access, "5000").is_err());
    }

    #[test]
    fn trunk_single_value_is_degenerate_range() {
        assert_eq!(
            get_vlan_spec(ConnectionMode::Trunk, "7").unwrap(),
            VlanSpec::Trunk(vec![NumericRange { start: 7, end: 7 }])
        );
    }

    #[test]
    fn trunk_ranges() {
        assert_eq!(
            get_vlan_spec(ConnectionMode::Trunk, "100-200").unwrap(),
            VlanSpec::Trunk(vec![NumericRange { start: 100, end: 200 }])
        );
        assert_eq!(
            get_vlan_spec(ConnectionMode::Trunk, "10-20, 30").unwrap(),
            VlanSpec::Trunk(vec![
                NumericRange { start: 10, end: 20 },
                NumericRange { start: 30, end: 30 },
            ])
        );
        assert!(get_vlan_spec(ConnectionMode::Trunk, "200-100").is_err());
        assert!(get_vlan_spec(ConnectionMode::Trunk, "1-2-3").is_err());
    }

    #[test]
    fn render_back_to_text() {
        let spec = get_vlan_spec(ConnectionMode::Trunk, "10-20,30").unwrap();
        assert_eq!(vlan_spec_to_string(&spec), "10-20,30");
        assert_eq!(vlan_spec_to_string(&VlanSpec::VlanId(5)), "5");
    }

    #[test]
    fn host_port_groups_trunk_everything() {
        let spec = get_vlan_spec(ConnectionMode::Trunk, "10-20").unwrap();
        assert_eq!(host_vlan_id(&spec), HOST_TRUNK_VLAN_ID);
        assert_eq!(host_vlan_id(&VlanSpec::VlanId(12)), 12);
    }
}
