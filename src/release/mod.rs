pub mod artifacts;
pub mod engine;
pub mod git_ref;
pub mod manifest;
pub mod publish;
pub mod version;

pub use engine::{ReleaseEngine, ReleaseReport, ReleaseSettings};
pub use git_ref::{GitRef, ReleaseVersion, TagPattern};
pub use manifest::Manifest;
pub use publish::{PackageIndex, PublishPlan};
