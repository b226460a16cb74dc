use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{normalize_code, MemberStore, StoreError};
use crate::models::member::Member;

/// In-process [`MemberStore`]
///
/// Enforces the same case-insensitive access-code uniqueness as the
/// Postgres index, so conflict handling can be exercised without a database.
#[derive(Debug, Default)]
pub struct InMemoryMemberStore {
    members: RwLock<BTreeMap<i64, Member>>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(members: impl IntoIterator<Item = Member>) -> Self {
        Self {
            members: RwLock::new(members.into_iter().map(|m| (m.id, m)).collect()),
        }
    }

    /// Inserts or replaces a member without any uniqueness check
    pub async fn insert(&self, member: Member) {
        self.members.write().await.insert(member.id, member);
    }

    pub async fn get(&self, id: i64) -> Option<Member> {
        self.members.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }

    /// Every non-blank access code, normalized
    pub async fn codes(&self) -> Vec<String> {
        self.members
            .read()
            .await
            .values()
            .filter(|m| m.has_access_code())
            .filter_map(|m| m.access_code.as_deref().map(normalize_code))
            .collect()
    }
}

#[async_trait]
impl MemberStore for InMemoryMemberStore {
    async fn find_member_by_access_code(&self, code: &str) -> Result<Option<Member>, StoreError> {
        let wanted = normalize_code(code);
        if wanted.is_empty() {
            return Ok(None);
        }

        Ok(self
            .members
            .read()
            .await
            .values()
            .find(|m| m.access_code.as_deref().map(normalize_code) == Some(wanted.clone()))
            .cloned())
    }

    async fn find_member_by_id(&self, id: i64) -> Result<Option<Member>, StoreError> {
        Ok(self.get(id).await)
    }

    async fn persist(&self, member: &Member) -> Result<(), StoreError> {
        let mut members = self.members.write().await;

        if !members.contains_key(&member.id) {
            return Err(StoreError::Unavailable(format!(
                "member {} no longer exists",
                member.id
            )));
        }

        if member.has_access_code() {
            let code = member.access_code.as_deref().map(normalize_code);
            let taken = members
                .values()
                .filter(|other| other.id != member.id && other.has_access_code())
                .any(|other| other.access_code.as_deref().map(normalize_code) == code);
            if taken {
                return Err(StoreError::Conflict);
            }
        }

        if let Some(stored) = members.get_mut(&member.id) {
            stored.access_code = member.access_code.clone();
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_members_without_code(&self) -> Result<Vec<Member>, StoreError> {
        Ok(self
            .members
            .read()
            .await
            .values()
            .filter(|m| !m.has_access_code())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: i64, code: Option<&str>) -> Member {
        Member {
            id,
            member_number: format!("{}", 1000 + id),
            first_name: Some("Test".to_string()),
            last_name: Some("Member".to_string()),
            mobile_phone: None,
            email: None,
            is_admin: false,
            access_code: code.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_by_access_code_ignores_case_and_whitespace() {
        let store = InMemoryMemberStore::with_members([member(1, Some(" abc234 "))]);

        let found = store.find_member_by_access_code("ABC234").await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(1));
        assert!(store.find_member_by_access_code("   ").await.unwrap().is_none());
        assert!(store.find_member_by_access_code("XYZ789").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_rejects_duplicate_code() {
        let store = InMemoryMemberStore::with_members([member(1, Some("ABC234")), member(2, None)]);

        let mut second = store.get(2).await.unwrap();
        second.access_code = Some("abc234".to_string());
        assert_eq!(store.persist(&second).await, Err(StoreError::Conflict));

        second.access_code = Some("DEF567".to_string());
        store.persist(&second).await.unwrap();
        assert_eq!(store.get(2).await.unwrap().access_code.as_deref(), Some("DEF567"));
    }

    #[tokio::test]
    async fn test_persist_writes_only_access_code() {
        let store = InMemoryMemberStore::with_members([member(1, Some("ABC234"))]);
        let mut stale = store.get(1).await.unwrap();

        let mut promoted = stale.clone();
        promoted.is_admin = true;
        promoted.email = Some("new@example.org".to_string());
        store.insert(promoted).await;

        stale.access_code = Some("ABC234".to_string());
        store.persist(&stale).await.unwrap();
        stale.access_code = Some("DEF567".to_string());
        store.persist(&stale).await.unwrap();

        let stored = store.get(1).await.unwrap();
        assert!(stored.is_admin);
        assert_eq!(stored.email.as_deref(), Some("new@example.org"));
        assert_eq!(stored.access_code.as_deref(), Some("DEF567"));
    }

    #[tokio::test]
    async fn test_persist_unknown_member() {
        let store = InMemoryMemberStore::new();
        let result = store.persist(&member(9, None)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_list_members_without_code() {
        let store = InMemoryMemberStore::with_members([
            member(1, Some("ABC234")),
            member(2, None),
            member(3, Some("  ")),
        ]);

        let ids: Vec<i64> = store
            .list_members_without_code()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
