//! Free-text search across the names shown in rental tables.

use crate::rental::AnyRental;

/// Keep rentals whose buyer, seller or product name contains `term`,
/// ignoring case. A blank term keeps everything.
pub fn text_search<'a, I>(requests: I, term: &str) -> Vec<&'a AnyRental>
where
    I: IntoIterator<Item = &'a AnyRental>,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return requests.into_iter().collect();
    }

    requests
        .into_iter()
        .filter(|rental| {
            let data = rental.data();
            let seller = data.seller.as_ref().map(|s| s.name.as_str());
            [Some(data.buyer.name.as_str()), seller, Some(data.product.name.as_str())]
                .into_iter()
                .flatten()
                .any(|name| name.to_lowercase().contains(&needle))
        })
        .collect()
}
