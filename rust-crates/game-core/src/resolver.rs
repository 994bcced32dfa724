use crate::catalog::CatalogItem;
use rand::Rng;

/// Resolve a uniform sample in `[0, 100)` against the catalog's draw weights.
///
/// Each entry covers the half-open interval `[previous cumulative, cumulative)`
/// of the running weight sum, walked in catalog order. A sample the weights
/// never reach falls back to the last entry, so a catalog whose weights drift
/// below 100 still resolves.
pub fn resolve<'a>(catalog: &'a [CatalogItem], sample: f64) -> &'a CatalogItem {
    let mut cumulative = 0.0;
    for item in catalog {
        cumulative += item.chance;
        if sample < cumulative {
            return item;
        }
    }
    catalog.last().expect("catalog contains at least one item")
}

/// Draw a reward from the injected generator. All randomness enters here.
pub fn draw<'a, R: Rng + ?Sized>(
    catalog: &'a [CatalogItem],
    rng: &mut R,
) -> &'a CatalogItem {
    let sample = rng.random_range(0.0..100.0);
    resolve(catalog, sample)
}
