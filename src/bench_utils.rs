use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

use crate::store::DocumentStore;

pub const CATEGORIES: &[&str] = &["news", "sports", "music", "travel", "food", "tech"];

#[derive(Clone, Debug)]
pub struct DocumentSeed {
    pub id: String,
    pub data: Value,
}

#[derive(Clone, Debug)]
pub struct LinkSeed {
    pub source_id: String,
    pub target_id: String,
}

/// Users, their posts, and `follows`/`authored` links between them.
#[derive(Clone, Debug)]
pub struct SocialDataset {
    pub users: Vec<DocumentSeed>,
    pub posts: Vec<DocumentSeed>,
    pub follows: Vec<LinkSeed>,
    pub authored: Vec<LinkSeed>,
}

impl SocialDataset {
    pub fn documents(&self) -> usize {
        self.users.len() + self.posts.len()
    }

    pub fn links(&self) -> usize {
        self.follows.len() + self.authored.len()
    }

    /// Loads the dataset into `store`: `users`, `posts`, `users -follows-> users`
    /// and `users -authored-> posts`.
    pub fn load(&self, store: &DocumentStore) {
        for user in &self.users {
            store.add_document("users", &user.id, user.data.clone());
        }
        for post in &self.posts {
            store.add_document("posts", &post.id, post.data.clone());
        }
        for link in &self.follows {
            store.create_relationship("users", &link.source_id, "users", &link.target_id, "follows");
        }
        for link in &self.authored {
            store.create_relationship("users", &link.source_id, "posts", &link.target_id, "authored");
        }
    }
}

pub fn generate_social(users: usize, posts_per_user: usize, follows_per_user: usize, seed: u64) -> SocialDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let users_seed: Vec<DocumentSeed> = (0..users)
        .map(|i| DocumentSeed {
            id: format!("u{i}"),
            data: json!({
                "name": format!("user-{i}"),
                "age": rng.gen_range(13..90),
                "profile": { "city": format!("city-{}", rng.gen_range(0..50)) },
            }),
        })
        .collect();
    let mut posts = Vec::with_capacity(users * posts_per_user);
    let mut authored = Vec::with_capacity(users * posts_per_user);
    for user in 0..users {
        for n in 0..posts_per_user {
            let id = format!("p{user}-{n}");
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            posts.push(DocumentSeed {
                id: id.clone(),
                data: json!({ "category": category, "likes": rng.gen_range(0..1000) }),
            });
            authored.push(LinkSeed {
                source_id: format!("u{user}"),
                target_id: id,
            });
        }
    }
    let mut follows = Vec::new();
    if users > 1 {
        for user in 0..users {
            for _ in 0..follows_per_user {
                let target = rng.gen_range(0..users);
                if target != user {
                    follows.push(LinkSeed {
                        source_id: format!("u{user}"),
                        target_id: format!("u{target}"),
                    });
                }
            }
        }
    }
    SocialDataset {
        users: users_seed,
        posts,
        follows,
        authored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_social_is_deterministic() {
        let a = generate_social(20, 3, 2, 7);
        let b = generate_social(20, 3, 2, 7);
        assert_eq!(a.posts.len(), 60);
        assert_eq!(a.authored.len(), 60);
        assert_eq!(
            a.posts.iter().map(|p| &p.data).collect::<Vec<_>>(),
            b.posts.iter().map(|p| &p.data).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_load_populates_store() {
        let dataset = generate_social(10, 2, 3, 11);
        let store = DocumentStore::new();
        dataset.load(&store);
        assert_eq!(store.document_count("users"), 10);
        assert_eq!(store.document_count("posts"), 20);
        let authored = store.get_related_documents("users", "u0", "posts", "authored");
        assert_eq!(authored.len(), 2);
    }
}
