pub mod catalog;
pub mod error;
pub mod license;
pub mod model;
pub mod patch;
pub mod prepare;
pub mod setup;
pub mod values;

pub use crate::catalog::Catalog;
pub use crate::error::{CatalogError, PatchError, SetupError};
pub use crate::model::{
    AppendRule, DirectorySpec, LicenseMode, LicenseSpec, OverrideRule, ResourceCopySpec,
};
pub use crate::patch::{AppliedPatch, PatchFailure, PatchReport, apply_appends, apply_overrides};
pub use crate::setup::{Outcome, SetupContext, SetupReport, setup_test_environment};
pub use crate::values::{ValueMap, resolve};
