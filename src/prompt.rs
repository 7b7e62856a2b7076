//! Default prompt synthesis for when the user leaves the prompt blank.

use std::collections::BTreeSet;

use crate::options::Style;

const SUBJECT: &str = "người mẫu";
const PRODUCT_CLAUSE: &str = "tương tác với sản phẩm được cung cấp";
const CLOTHING_CLAUSE: &str = "mặc trang phục được cung cấp";
const LOGO_CLAUSE: &str = "thêm logo vào góc trên bên phải một cách nổi bật và hài hòa";
const SCENE: [&str; 3] =
    ["bối cảnh ngoài trời hiện đại", "ánh sáng tự nhiên", "tông màu da chân thực"];

/// Build a prompt from which auxiliary images are present and the selected styles.
///
/// Styles appear in canonical order regardless of selection order.
#[must_use]
pub fn synthesize(
    has_product: bool,
    has_clothing: bool,
    has_logo: bool,
    styles: &BTreeSet<Style>,
) -> String {
    let mut parts = vec![SUBJECT];
    if has_product {
        parts.push(PRODUCT_CLAUSE);
    }
    if has_clothing {
        parts.push(CLOTHING_CLAUSE);
    }
    if has_logo {
        parts.push(LOGO_CLAUSE);
    }
    parts.extend(styles.iter().map(|s| s.label()));
    parts.extend(SCENE);
    parts.join(", ")
}
