/// One anchor from the listing page whose href carries the entry prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLink {
    pub href: String,
    pub text: String,
}

impl CatalogLink {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}
