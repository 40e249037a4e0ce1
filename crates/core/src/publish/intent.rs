//! Publish intent.
//!
//! What used to be transient publish state stamped onto the entity travels
//! here instead, as an explicit command value: the requested action plus the
//! culture sets it touches. The entity only ever carries settled state.

use chrono::{DateTime, Utc};

use crate::model::{Content, CultureInfo, CULTURE_ALL};

/// The requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentAction {
    Publish,
    Unpublish,
}

/// One publish/unpublish command against one document.
///
/// A `Publish` intent can simultaneously publish some cultures and unpublish
/// others; an `Unpublish` intent retires the whole document.
#[derive(Debug, Clone)]
pub struct PublishIntent {
    pub action: IntentAction,
    /// Cultures to publish. `["*"]` for invariant content.
    pub cultures_publishing: Vec<String>,
    /// Cultures to unpublish within a publish action.
    pub cultures_unpublishing: Vec<String>,
}

impl PublishIntent {
    /// Build a publish intent for the requested cultures.
    ///
    /// Invariant content publishes the `"*"` token. For variant content the
    /// wildcard expands to every available culture, and cultures that are
    /// already published with no pending edits are skipped.
    pub fn publish(content: &Content, cultures: &[String]) -> Self {
        let cultures_publishing = if content.varies_by_culture() {
            let requested: Vec<String> = if cultures.iter().any(|c| c == CULTURE_ALL) {
                content.available_cultures()
            } else {
                cultures.to_vec()
            };
            requested
                .into_iter()
                .filter(|c| !content.is_culture_published(c) || content.is_culture_edited(c))
                .collect()
        } else {
            vec![CULTURE_ALL.to_string()]
        };
        Self {
            action: IntentAction::Publish,
            cultures_publishing,
            cultures_unpublishing: Vec::new(),
        }
    }

    /// Build an unpublish intent for the whole document.
    pub fn unpublish() -> Self {
        Self {
            action: IntentAction::Unpublish,
            cultures_publishing: Vec::new(),
            cultures_unpublishing: Vec::new(),
        }
    }

    /// Build an intent unpublishing a single culture. Returns the intent and
    /// whether the culture was actually published (and will be removed).
    pub fn unpublish_culture(content: &Content, culture: &str) -> (Self, bool) {
        Self::unpublish_cultures(content, &[culture.to_string()])
    }

    /// Build an intent unpublishing several cultures within a publish action.
    pub fn unpublish_cultures(content: &Content, cultures: &[String]) -> (Self, bool) {
        let cultures_unpublishing: Vec<String> = cultures
            .iter()
            .filter(|c| content.is_culture_published(c))
            .cloned()
            .collect();
        let removed = !cultures_unpublishing.is_empty();
        (
            Self {
                action: IntentAction::Publish,
                cultures_publishing: Vec::new(),
                cultures_unpublishing,
            },
            removed,
        )
    }

    pub fn is_publish(&self) -> bool {
        self.action == IntentAction::Publish
    }

    /// The set of cultures that would be published after this intent is
    /// applied, starting from the document's current published set.
    pub fn resulting_published_cultures(&self, content: &Content) -> Vec<String> {
        let mut set = content.published_cultures();
        for culture in &self.cultures_publishing {
            if culture != CULTURE_ALL {
                set.insert(culture.clone());
            }
        }
        for culture in &self.cultures_unpublishing {
            set.remove(culture);
        }
        set.into_iter().collect()
    }

    /// Apply the intent to the entity, settling its published state. Only
    /// called once every strategy check has passed.
    pub fn apply(&self, content: &mut Content, now: DateTime<Utc>) {
        for culture in &self.cultures_publishing {
            if culture == CULTURE_ALL {
                continue;
            }
            let fallback = content.name.clone();
            let info = content
                .cultures
                .entry(culture.clone())
                .or_insert_with(|| CultureInfo::new(fallback));
            info.published = true;
            info.edited = false;
            info.publish_date = Some(now);
        }
        for culture in &self.cultures_unpublishing {
            if let Some(info) = content.cultures.get_mut(culture) {
                info.published = false;
            }
        }
        content.published = true;
        content.edited = if content.varies_by_culture() {
            content
                .cultures
                .values()
                .any(|c| c.published && c.edited)
        } else {
            false
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{ContentType, ROOT_ID};

    fn variant_item() -> Content {
        let ct = ContentType::new("post", "Post", true);
        let mut item = Content::new("Post", ROOT_ID, &ct, -1);
        item.set_culture_name("en-us", "Post");
        item.set_culture_name("da-dk", "Indlæg");
        item
    }

    #[test]
    fn invariant_publish_targets_the_wildcard() {
        let ct = ContentType::new("page", "Page", false);
        let item = Content::new("Home", ROOT_ID, &ct, -1);
        let intent = PublishIntent::publish(&item, &[CULTURE_ALL.to_string()]);
        assert_eq!(intent.cultures_publishing, vec![CULTURE_ALL.to_string()]);
    }

    #[test]
    fn wildcard_expands_and_skips_clean_published_cultures() {
        let mut item = variant_item();
        item.published = true;
        {
            let info = item.cultures.get_mut("en-us").unwrap();
            info.published = true;
            info.edited = false;
        }
        let intent = PublishIntent::publish(&item, &[CULTURE_ALL.to_string()]);
        assert_eq!(intent.cultures_publishing, vec!["da-dk".to_string()]);
    }

    #[test]
    fn unpublishing_an_unpublished_culture_removes_nothing() {
        let item = variant_item();
        let (intent, removed) = PublishIntent::unpublish_culture(&item, "en-us");
        assert!(!removed);
        assert!(intent.cultures_unpublishing.is_empty());
    }

    #[test]
    fn apply_settles_culture_flags() {
        let mut item = variant_item();
        let intent = PublishIntent::publish(&item, &["en-us".to_string()]);
        intent.apply(&mut item, Utc::now());

        assert!(item.published);
        assert!(item.is_culture_published("en-us"));
        assert!(!item.is_culture_published("da-dk"));
        // da-dk still carries edits but is not published, so the document
        // itself is not edited.
        assert!(!item.cultures.get("en-us").unwrap().edited);
    }

    #[test]
    fn resulting_set_merges_publish_and_unpublish() {
        let mut item = variant_item();
        item.published = true;
        item.cultures.get_mut("en-us").unwrap().published = true;

        let intent = PublishIntent {
            action: IntentAction::Publish,
            cultures_publishing: vec!["da-dk".to_string()],
            cultures_unpublishing: vec!["en-us".to_string()],
        };
        assert_eq!(
            intent.resulting_published_cultures(&item),
            vec!["da-dk".to_string()]
        );
    }
}
