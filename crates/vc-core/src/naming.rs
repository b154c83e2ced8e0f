//! Port group naming rule.
//!
//! Connect derives the name, disconnect re-derives or pattern-matches it, so
//! generation and detection must stay in lockstep.

use std::sync::OnceLock;

use regex::Regex;
use vc_shared_types::ConnectionMode;

pub const MAX_DVSWITCH_LENGTH: usize = 60;
pub const QS_NAME_PREFIX: &str = "QS";

fn generated_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!("^{}_.*_VLAN", QS_NAME_PREFIX)).expect("static pattern is valid")
    })
}

/// `QS_<switch[:60]>_VLAN_<vlan>_<mode>`
pub fn generate_port_group_name(
    switch_name: &str,
    vlan_id: &str,
    port_mode: ConnectionMode,
) -> String {
    let switch_name: String = switch_name.chars().take(MAX_DVSWITCH_LENGTH).collect();
    format!(
        "{}_{}_VLAN_{}_{}",
        QS_NAME_PREFIX,
        switch_name,
        vlan_id,
        port_mode.as_str()
    )
}

/// Whether a network name looks like one this connector generated
pub fn is_network_generated_name(name: &str) -> bool {
    generated_name_pattern().is_match(name)
}
