//! Implementation of `keel list`.

use anyhow::Result;

use crate::builder::backend::BackendKind;
use crate::builder::context::BuildContext;
use crate::core::descriptor::DescriptorStore;
use crate::core::package::{Package, Stage};

/// One line of `keel list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageListing {
    pub name: String,
    pub backend: Option<BackendKind>,
    /// Stage under the context's profile
    pub stage: Stage,
}

/// Every stored package, sorted by name.
pub fn list_packages(ctx: &BuildContext) -> Result<Vec<PackageListing>> {
    DescriptorStore::new(&ctx.project)
        .list()?
        .into_iter()
        .map(|name| {
            let package = Package::open(ctx, &name)?;
            Ok(PackageListing {
                backend: package.backend_kind(),
                stage: package.stage(),
                name,
            })
        })
        .collect()
}
