//! Savings groups, members and signatories

mod model;
mod service;

pub use model::{
    CreateGroupRequest, Group, GroupDetail, GroupMember, GroupStatus, SetGroupStatusRequest,
    Signatories,
};
pub use service::GroupService;
