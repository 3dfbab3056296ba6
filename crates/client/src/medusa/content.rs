//! CMS content: static pages and FAQs.

use serde::Deserialize;
use tracing::instrument;

use super::types::{ContentPage, Faq};
use super::{MedusaClient, MedusaError, segment};

#[derive(Deserialize)]
struct PageEnvelope {
    page: ContentPage,
}

#[derive(Deserialize)]
struct FaqsEnvelope {
    faqs: Vec<Faq>,
}

impl MedusaClient {
    /// A published page by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the page does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn get_page(&self, slug: &str) -> Result<ContentPage, MedusaError> {
        let envelope: PageEnvelope = self
            .get(&format!("/store/content/pages/{}", segment(slug)))
            .await?;
        Ok(envelope.page)
    }

    /// All FAQs, in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_faqs(&self) -> Result<Vec<Faq>, MedusaError> {
        let envelope: FaqsEnvelope = self.get("/store/content/faqs").await?;
        Ok(envelope.faqs)
    }
}

/// Group FAQs by category, keeping first-seen category order. Uncategorized
/// entries come last under `None`.
#[must_use]
pub fn group_faqs(faqs: &[Faq]) -> Vec<(Option<&str>, Vec<&Faq>)> {
    let mut groups: Vec<(Option<&str>, Vec<&Faq>)> = Vec::new();
    for faq in faqs {
        let category = faq.category.as_deref();
        match groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, entries)) => entries.push(faq),
            None => groups.push((category, vec![faq])),
        }
    }
    groups.sort_by_key(|(category, _)| category.is_none());
    groups
}
