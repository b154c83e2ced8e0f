use vc_shared_types::{MoRef, NetworkInfo, NetworkKind};

/// A network as seen from a datacenter or a VM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHandler {
    info: NetworkInfo,
}

impl NetworkHandler {
    pub fn new(info: NetworkInfo) -> Self {
        Self { info }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn moref(&self) -> &MoRef {
        &self.info.moref
    }

    pub fn port_group_key(&self) -> Option<&str> {
        self.info.port_group_key()
    }

    pub fn is_distributed(&self) -> bool {
        matches!(self.info.kind, NetworkKind::DistributedPortGroup { .. })
    }

    pub fn info(&self) -> &NetworkInfo {
        &self.info
    }
}

impl std::fmt::Display for NetworkHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Network '{}'", self.info.name)
    }
}
