//! Deployment actions and the Merkle bundles that commit to them.

pub mod bundle;
pub mod codec;
pub mod plan;

pub use bundle::{
    ActionBundle, ActionProof, BundledAction, deployment_id, make_action_bundle, order_actions,
};
pub use codec::{Action, ActionType, CodecError, RawAction};
pub use plan::plan_actions;
