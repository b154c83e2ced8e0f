pub mod connectivity;
pub mod error;
pub mod events;
pub mod network;
pub mod vsphere;

pub use connectivity::{
    ActionResult, ActionTarget, Attribute, ConnectionMode, ConnectionParams, ConnectivityAction,
    ConnectivityActionType, ConnectivityRequest, ConnectivityResponse, DriverRequest,
    DriverResponse, RequestAction, INTERFACE_ATTRIBUTE, VM_UUID_ATTRIBUTE, VNIC_NAME_ATTRIBUTE,
};
pub use error::{SharedResult, SharedTypeError};
pub use events::SystemEvent;
pub use network::MacAddr;
pub use vsphere::{
    ClusterInfo, ConnectInfo, DeviceOperation, DvPortGroupInfo, DvPortGroupSpec, DvSwitchInfo,
    HostPortGroupInfo, HostPortGroupSpec, HostVSwitchInfo, MoRef, NetworkInfo, NetworkKind,
    NumericRange, PortGroupBinding, PowerState, SecurityPolicy, TaskError, TaskInfo, TaskRef,
    TaskState, ToolsStatus, VirtualDeviceSpec, VirtualNicDevice, VlanSpec, VmConfigSpec, VmInfo,
    VnicBacking,
};
