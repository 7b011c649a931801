//! Brand lookup against the optional `brands.yaml` registry.

use std::path::Path;

use brandpulse_core::{BrandConfig, ConfigError};

/// Resolve `query` to a brand config.
///
/// A missing registry file or an unknown name yields an ad-hoc config built
/// from the name alone. A registry that exists but fails to parse or
/// validate is an error.
pub(crate) fn resolve_brand(brands_path: &Path, query: &str) -> anyhow::Result<BrandConfig> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("brand name must be non-empty");
    }

    let registry = match brandpulse_core::load_brands(brands_path) {
        Ok(file) => file,
        Err(ConfigError::BrandsFileIo { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            tracing::debug!(
                path = %brands_path.display(),
                "no brands file, using ad-hoc brand config"
            );
            return Ok(BrandConfig::adhoc(query));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(brand) = registry.find(query) {
        return Ok(brand.clone());
    }
    tracing::info!(brand = query, "brand not in registry, using ad-hoc config");
    Ok(BrandConfig::adhoc(query))
}
