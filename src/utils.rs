//! Id generation helpers

use bech32::Bech32m;
use uuid7::uuid7;

use crate::error::TaxonomyError;

/// Human-readable prefixes for the three node depths and for products.
pub const CATEGORY_HRP: &str = "cat_";
pub const SUBCATEGORY_HRP: &str = "sub_";
pub const SUBSUBCATEGORY_HRP: &str = "ssc_";
pub const PRODUCT_HRP: &str = "prd_";

// construct a fresh uuid7 then encode using bech32 under a depth prefix
pub fn new_node_id(hrp: &str) -> Result<String, TaxonomyError> {
    let hrp = bech32::Hrp::parse(hrp).map_err(|e| TaxonomyError::Validation(e.to_string()))?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())
        .map_err(|e| TaxonomyError::Encode(e.to_string()))?;
    Ok(encode)
}
