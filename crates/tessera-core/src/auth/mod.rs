//! Authorization protocol: auth leaves, their bundle and who must sign what.

pub mod authorizer;
pub mod bundle;
pub mod derive;
pub mod leaf;
pub mod signature;

pub use authorizer::{AuthorityContext, RoleType, SignerInfo, check_org_id, signer_info};
pub use bundle::{AuthBundle, BundledAuthLeaf, make_auth_bundle};
pub use derive::{LeafDerivation, derive_auth_leaves};
pub use leaf::{AuthLeaf, AuthLeafType, LeafPayload};
pub use signature::{SigningError, recover_signer, sign_auth_root};
