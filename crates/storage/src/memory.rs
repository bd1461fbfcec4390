use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    NewPvz, NewUser, Product, ProductId, ProductRow, ProductRowQuery, ProductType, Pvz, PvzId,
    Reception, ReceptionId, ReceptionStatus, Result, StoreError, User, UserId,
    store::PvzStore,
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Default)]
struct State {
    users: Vec<User>,
    pvz: Vec<Pvz>,
    receptions: Vec<(u64, Reception)>,
    products: Vec<(u64, Product)>,
    next_seq: u64,
}

impl State {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn require_pvz(&self, pvz_id: PvzId) -> Result<&Pvz> {
        self.pvz
            .iter()
            .find(|p| p.id == pvz_id)
            .ok_or(StoreError::PvzNotFound(pvz_id))
    }

    fn latest_reception_mut(&mut self, pvz_id: PvzId) -> Option<&mut Reception> {
        self.receptions
            .iter_mut()
            .filter(|(_, r)| r.pvz_id == pvz_id)
            .max_by_key(|(seq, r)| (r.created_at, *seq))
            .map(|(_, r)| r)
    }

    fn open_reception(&self, pvz_id: PvzId) -> Option<&Reception> {
        self.receptions
            .iter()
            .map(|(_, r)| r)
            .find(|r| r.pvz_id == pvz_id && r.status.can_modify_products())
    }
}

/// In-memory store implementation for testing.
///
/// All mutations are serialized behind one write lock, which trivially
/// serializes lifecycle calls per pickup point.
#[derive(Clone)]
pub struct InMemoryPvzStore {
    state: Arc<RwLock<State>>,
    clock: Clock,
}

impl InMemoryPvzStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Creates a store that stamps new receptions and products with `clock`.
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            clock: Arc::new(clock),
        }
    }
}

impl Default for InMemoryPvzStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PvzStore for InMemoryPvzStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken(user.email));
        }

        let user = User {
            id: UserId::new(),
            email: user.email,
            secret_hash: user.secret_hash,
            roles: user.roles,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_pvz(&self, pvz: NewPvz) -> Result<Pvz> {
        let mut state = self.state.write().await;
        let id = pvz.id.unwrap_or_default();
        if state.pvz.iter().any(|p| p.id == id) {
            return Err(StoreError::PvzAlreadyExists(id));
        }

        let pvz = Pvz {
            id,
            created_at: pvz.created_at.unwrap_or_else(|| (self.clock)()),
            city: pvz.city,
            creator_id: pvz.creator_id,
        };
        state.pvz.push(pvz.clone());
        Ok(pvz)
    }

    async fn list_pvz(&self) -> Result<Vec<Pvz>> {
        let state = self.state.read().await;
        let mut pvz = state.pvz.clone();
        pvz.sort_by_key(|p| (p.created_at, p.id));
        Ok(pvz)
    }

    async fn open_reception(&self, pvz_id: PvzId, creator: Option<UserId>) -> Result<Reception> {
        let mut state = self.state.write().await;
        state.require_pvz(pvz_id)?;
        if state.open_reception(pvz_id).is_some() {
            return Err(StoreError::ReceptionAlreadyOpen(pvz_id));
        }

        let reception = Reception {
            id: ReceptionId::new(),
            pvz_id,
            created_at: (self.clock)(),
            status: ReceptionStatus::InProgress,
            creator_id: creator,
        };
        let seq = state.seq();
        state.receptions.push((seq, reception.clone()));
        Ok(reception)
    }

    async fn close_last_reception(&self, pvz_id: PvzId) -> Result<Reception> {
        let mut state = self.state.write().await;
        state.require_pvz(pvz_id)?;

        let reception = state
            .latest_reception_mut(pvz_id)
            .ok_or(StoreError::NoReception(pvz_id))?;
        if !reception.status.can_close() {
            return Err(StoreError::ReceptionAlreadyClosed(reception.id));
        }

        reception.status = ReceptionStatus::Closed;
        Ok(reception.clone())
    }

    async fn add_product(
        &self,
        pvz_id: PvzId,
        product_type: ProductType,
        creator: Option<UserId>,
    ) -> Result<Product> {
        let mut state = self.state.write().await;
        state.require_pvz(pvz_id)?;

        let reception_id = state
            .open_reception(pvz_id)
            .map(|r| r.id)
            .ok_or(StoreError::NoOpenReception(pvz_id))?;

        let product = Product {
            id: ProductId::new(),
            reception_id,
            created_at: (self.clock)(),
            product_type,
            creator_id: creator,
        };
        let seq = state.seq();
        state.products.push((seq, product.clone()));
        Ok(product)
    }

    async fn delete_last_product(&self, pvz_id: PvzId) -> Result<Product> {
        let mut state = self.state.write().await;
        state.require_pvz(pvz_id)?;

        let reception_id = state
            .open_reception(pvz_id)
            .map(|r| r.id)
            .ok_or(StoreError::NoOpenReception(pvz_id))?;

        let index = state
            .products
            .iter()
            .enumerate()
            .filter(|(_, (_, p))| p.reception_id == reception_id)
            .max_by_key(|(_, (seq, p))| (p.created_at, *seq))
            .map(|(index, _)| index)
            .ok_or(StoreError::EmptyReception(reception_id))?;

        let (_, product) = state.products.remove(index);
        Ok(product)
    }

    async fn product_rows(&self, query: ProductRowQuery) -> Result<Vec<ProductRow>> {
        let state = self.state.read().await;

        let mut joined = Vec::new();
        for (seq, product) in &state.products {
            if !query.contains(product.created_at) {
                continue;
            }
            let Some((_, reception)) = state
                .receptions
                .iter()
                .find(|(_, r)| r.id == product.reception_id)
            else {
                continue;
            };
            let Some(pvz) = state.pvz.iter().find(|p| p.id == reception.pvz_id) else {
                continue;
            };
            joined.push((*seq, pvz, reception, product));
        }

        joined.sort_by_key(|(seq, pvz, reception, product)| {
            (
                Reverse(pvz.created_at),
                pvz.id,
                Reverse(reception.created_at),
                reception.id,
                Reverse(product.created_at),
                Reverse(*seq),
            )
        });

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

        Ok(joined
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, pvz, reception, product)| ProductRow {
                pvz_id: pvz.id,
                pvz_created_at: pvz.created_at,
                city: pvz.city,
                reception_id: reception.id,
                reception_created_at: reception.created_at,
                reception_status: reception.status,
                product_id: product.id,
                product_created_at: product.created_at,
                product_type: product.product_type,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::City;

    fn ticking_store() -> InMemoryPvzStore {
        let start = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        let ticks = Arc::new(AtomicI64::new(0));
        InMemoryPvzStore::with_clock(move || {
            start + Duration::minutes(ticks.fetch_add(1, Ordering::SeqCst))
        })
    }

    async fn create_pvz(store: &InMemoryPvzStore) -> PvzId {
        store.create_pvz(NewPvz::new(City::Moscow)).await.unwrap().id
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let store = InMemoryPvzStore::new();
        let user = NewUser {
            email: "a@example.com".to_string(),
            secret_hash: "hash".to_string(),
            roles: vec![crate::Role::Employee],
        };
        store.create_user(user.clone()).await.unwrap();

        let result = store.create_user(user).await;
        assert!(matches!(result, Err(StoreError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn create_pvz_with_explicit_id() {
        let store = InMemoryPvzStore::new();
        let id = PvzId::new();
        let pvz = store
            .create_pvz(NewPvz::new(City::Kazan).with_id(id))
            .await
            .unwrap();
        assert_eq!(pvz.id, id);

        let result = store.create_pvz(NewPvz::new(City::Kazan).with_id(id)).await;
        assert!(matches!(result, Err(StoreError::PvzAlreadyExists(dup)) if dup == id));
    }

    #[tokio::test]
    async fn open_reception_requires_pvz() {
        let store = InMemoryPvzStore::new();
        let result = store.open_reception(PvzId::new(), None).await;
        assert!(matches!(result, Err(StoreError::PvzNotFound(_))));
    }

    #[tokio::test]
    async fn only_one_open_reception() {
        let store = InMemoryPvzStore::new();
        let pvz_id = create_pvz(&store).await;

        store.open_reception(pvz_id, None).await.unwrap();
        let result = store.open_reception(pvz_id, None).await;
        assert!(matches!(result, Err(StoreError::ReceptionAlreadyOpen(_))));
    }

    #[tokio::test]
    async fn close_then_close_again_conflicts() {
        let store = InMemoryPvzStore::new();
        let pvz_id = create_pvz(&store).await;

        let result = store.close_last_reception(pvz_id).await;
        assert!(matches!(result, Err(StoreError::NoReception(_))));

        let opened = store.open_reception(pvz_id, None).await.unwrap();
        let closed = store.close_last_reception(pvz_id).await.unwrap();
        assert_eq!(closed.id, opened.id);
        assert_eq!(closed.status, ReceptionStatus::Closed);

        let result = store.close_last_reception(pvz_id).await;
        assert!(matches!(result, Err(StoreError::ReceptionAlreadyClosed(id)) if id == opened.id));
    }

    #[tokio::test]
    async fn delete_last_product_is_lifo() {
        let store = InMemoryPvzStore::new();
        let pvz_id = create_pvz(&store).await;
        store.open_reception(pvz_id, None).await.unwrap();

        let first = store
            .add_product(pvz_id, ProductType::Electronics, None)
            .await
            .unwrap();
        let second = store
            .add_product(pvz_id, ProductType::Shoes, None)
            .await
            .unwrap();

        assert_eq!(store.delete_last_product(pvz_id).await.unwrap().id, second.id);
        assert_eq!(store.delete_last_product(pvz_id).await.unwrap().id, first.id);

        let result = store.delete_last_product(pvz_id).await;
        assert!(matches!(result, Err(StoreError::EmptyReception(_))));
    }

    #[tokio::test]
    async fn lifo_ties_fall_back_to_insertion_order() {
        let fixed = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        let store = InMemoryPvzStore::with_clock(move || fixed);
        let pvz_id = create_pvz(&store).await;
        store.open_reception(pvz_id, None).await.unwrap();

        store
            .add_product(pvz_id, ProductType::Clothing, None)
            .await
            .unwrap();
        let last = store
            .add_product(pvz_id, ProductType::Clothing, None)
            .await
            .unwrap();

        assert_eq!(store.delete_last_product(pvz_id).await.unwrap().id, last.id);
    }

    #[tokio::test]
    async fn products_require_open_reception() {
        let store = InMemoryPvzStore::new();
        let pvz_id = create_pvz(&store).await;

        let result = store.add_product(pvz_id, ProductType::Shoes, None).await;
        assert!(matches!(result, Err(StoreError::NoOpenReception(_))));

        store.open_reception(pvz_id, None).await.unwrap();
        store.close_last_reception(pvz_id).await.unwrap();

        let result = store.delete_last_product(pvz_id).await;
        assert!(matches!(result, Err(StoreError::NoOpenReception(_))));
    }

    #[tokio::test]
    async fn product_rows_are_sorted_and_windowed() {
        let store = ticking_store();
        let older = store
            .create_pvz(
                NewPvz::new(City::Moscow)
                    .registered_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            )
            .await
            .unwrap();
        let newer = store
            .create_pvz(
                NewPvz::new(City::Kazan)
                    .registered_at(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            )
            .await
            .unwrap();

        store.open_reception(older.id, None).await.unwrap();
        let a = store
            .add_product(older.id, ProductType::Electronics, None)
            .await
            .unwrap();
        store.open_reception(newer.id, None).await.unwrap();
        let b = store
            .add_product(newer.id, ProductType::Clothing, None)
            .await
            .unwrap();
        let c = store
            .add_product(newer.id, ProductType::Shoes, None)
            .await
            .unwrap();

        let all = ProductRowQuery::page(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC, 1, 10);
        let rows = store.product_rows(all).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let second_page =
            ProductRowQuery::page(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC, 2, 2);
        let rows = store.product_rows(second_page).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, a.id);
        assert_eq!(rows[0].pvz_id, older.id);

        let only_b = ProductRowQuery::page(b.created_at, b.created_at, 1, 10);
        let rows = store.product_rows(only_b).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, b.id);
    }

    #[tokio::test]
    async fn list_pvz_is_oldest_first() {
        let store = InMemoryPvzStore::new();
        let late = store
            .create_pvz(
                NewPvz::new(City::Moscow)
                    .registered_at(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            )
            .await
            .unwrap();
        let early = store
            .create_pvz(
                NewPvz::new(City::Kazan)
                    .registered_at(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            )
            .await
            .unwrap();

        let listed = store.list_pvz().await.unwrap();
        assert_eq!(listed, vec![early, late]);
    }
}
