use crate::Asset;

/// Which assets a caller may act on.
///
/// A scope that does not permit an asset makes it indistinguishable from a
/// missing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetScope {
    /// The HR user owning the inventory.
    Owner(String),
    /// Either the owner or the employee who requested the asset.
    Participant(String),
}

impl AssetScope {
    pub fn email(&self) -> &str {
        match self {
            AssetScope::Owner(email) | AssetScope::Participant(email) => email,
        }
    }

    pub fn permits(&self, asset: &Asset) -> bool {
        match self {
            AssetScope::Owner(email) => asset.is_owned_by(email),
            AssetScope::Participant(email) => asset.is_owned_by(email) || asset.is_requested_by(email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewAsset;
    use assetdesk_core::AssetId;
    use chrono::Utc;

    #[test]
    fn participant_scope_admits_requester_but_owner_scope_does_not() {
        let mut asset = Asset::create(
            AssetId::new(),
            "hr@acme.io",
            NewAsset {
                product_name: "Desk".into(),
                product_quantity: 1,
                product_type: None,
                availability: None,
                date_added: None,
            },
            Utc::now(),
        )
        .unwrap();
        asset.requester_email = Some("a@x.com".into());

        assert!(AssetScope::Owner("hr@acme.io".into()).permits(&asset));
        assert!(!AssetScope::Owner("a@x.com".into()).permits(&asset));
        assert!(AssetScope::Participant("a@x.com".into()).permits(&asset));
        assert!(!AssetScope::Participant("b@x.com".into()).permits(&asset));
    }
}
