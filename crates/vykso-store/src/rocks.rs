//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use vykso_core::{
    Account, AccountId, CreditTransaction, JobId, TransactionId, TransactionKind, VideoJob,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{JobTransition, LedgerReceipt, Store};

/// RocksDB-backed storage.
///
/// Mutating compound operations hold `write_gate` across their
/// read-modify-write cycle: this is the serialization point for balance
/// updates, so concurrent debits against the same account cannot both read
/// the old balance.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_gate: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_gate: Mutex::new(()),
        })
    }

    fn gate(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_gate
            .lock()
            .map_err(|_| StoreError::Database("write gate poisoned".into()))
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Stage an account record into a batch.
    fn stage_account(&self, batch: &mut WriteBatch, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        batch.put_cf(&cf, keys::account_key(&account.id), Self::serialize(account)?);
        Ok(())
    }

    /// Stage a transaction record plus its per-account index entry.
    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &CreditTransaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_index = self.cf(cf::TRANSACTIONS_BY_ACCOUNT)?;
        batch.put_cf(&cf_tx, keys::transaction_key(tx.id), Self::serialize(tx)?);
        batch.put_cf(
            &cf_index,
            keys::account_transaction_key(&tx.account_id, tx.id),
            [],
        );
        Ok(())
    }

    /// Stage a job record plus its per-account index entry.
    fn stage_job(&self, batch: &mut WriteBatch, job: &VideoJob) -> Result<()> {
        let cf_jobs = self.cf(cf::JOBS)?;
        let cf_index = self.cf(cf::JOBS_BY_ACCOUNT)?;
        batch.put_cf(&cf_jobs, keys::job_key(job.id), Self::serialize(job)?);
        batch.put_cf(&cf_index, keys::account_job_key(&job.account_id, job.id), []);
        Ok(())
    }

    /// Dedup-check an optional webhook event id and stage its record.
    fn stage_event(&self, batch: &mut WriteBatch, event_id: Option<&str>) -> Result<()> {
        let Some(event_id) = event_id else {
            return Ok(());
        };
        if self.has_processed_event(event_id)? {
            return Err(StoreError::DuplicateEvent {
                event_id: event_id.to_string(),
            });
        }
        let cf = self.cf(cf::PROCESSED_EVENTS)?;
        batch.put_cf(&cf, keys::event_key(event_id), []);
        Ok(())
    }

    fn load_account(&self, account_id: &AccountId) -> Result<Account> {
        self.get_account(account_id)?.ok_or(StoreError::NotFound)
    }

    fn load_job(&self, job_id: JobId) -> Result<VideoJob> {
        self.get_job(job_id)?.ok_or(StoreError::NotFound)
    }

    /// Scan an account's index column family and return the trailing ULIDs
    /// of matching keys, newest first, after pagination.
    fn scan_account_index(
        &self,
        cf_name: &str,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<[u8; 16]>> {
        let cf = self.cf(cf_name)?;
        let prefix = keys::account_prefix(account_id);

        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // ULIDs sort chronologically, so the scan is oldest-first; collect
        // then reverse for newest-first listings.
        let mut suffixes = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            suffixes.push(keys::ulid_suffix(&key));
        }
        suffixes.reverse();

        Ok(suffixes.into_iter().skip(offset).take(limit).collect())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Accounts
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, account)?;
        self.write(batch)
    }

    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf, keys::account_key(account_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_account(&self, account_id: &AccountId) -> Result<()> {
        let _gate = self.gate()?;
        if self.get_account(account_id)?.is_none() {
            return Err(StoreError::NotFound);
        }

        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .delete_cf(&cf, keys::account_key(account_id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn apply_plan_change(
        &self,
        account_id: &AccountId,
        plan: &str,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
        event_id: Option<&str>,
    ) -> Result<Account> {
        let _gate = self.gate()?;
        let mut batch = WriteBatch::default();
        self.stage_event(&mut batch, event_id)?;

        let mut account = self.load_account(account_id)?;
        account.set_plan(plan);
        if let Some(customer_ref) = customer_ref {
            account.billing_customer_ref = Some(customer_ref.to_string());
        }
        if let Some(subscription_ref) = subscription_ref {
            account.billing_subscription_ref = Some(subscription_ref.to_string());
            let cf_subs = self.cf(cf::ACCOUNTS_BY_SUBSCRIPTION)?;
            batch.put_cf(
                &cf_subs,
                keys::subscription_ref_key(subscription_ref),
                account.id.as_bytes(),
            );
        }

        self.stage_account(&mut batch, &account)?;
        self.write(batch)?;

        Ok(account)
    }

    fn find_account_by_subscription_ref(
        &self,
        subscription_ref: &str,
    ) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS_BY_SUBSCRIPTION)?;
        let Some(id_bytes) = self
            .db
            .get_cf(&cf, keys::subscription_ref_key(subscription_ref))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let uuid = uuid::Uuid::from_slice(&id_bytes)
            .map_err(|_| StoreError::Serialization("malformed subscription index entry".into()))?;
        self.get_account(&AccountId::from_uuid(uuid))
    }

    // =========================================================================
    // Credit ledger
    // =========================================================================

    fn debit(
        &self,
        account_id: &AccountId,
        amount: i64,
        description: &str,
    ) -> Result<LedgerReceipt> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let _gate = self.gate()?;
        let mut account = self.load_account(account_id)?;
        if account.credits < amount {
            return Err(StoreError::InsufficientCredits {
                balance: account.credits,
                required: amount,
            });
        }

        account.credits -= amount;
        account.updated_at = chrono::Utc::now();
        let tx =
            CreditTransaction::debit(*account_id, amount, account.credits, description.to_string());

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(LedgerReceipt {
            balance: account.credits,
            transaction: tx,
        })
    }

    fn refund(
        &self,
        account_id: &AccountId,
        amount: i64,
        description: &str,
    ) -> Result<LedgerReceipt> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let _gate = self.gate()?;
        let mut account = self.load_account(account_id)?;
        account.credits += amount;
        account.updated_at = chrono::Utc::now();
        let tx = CreditTransaction::refund(
            *account_id,
            amount,
            account.credits,
            description.to_string(),
        );

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(LedgerReceipt {
            balance: account.credits,
            transaction: tx,
        })
    }

    fn add_credits(
        &self,
        account_id: &AccountId,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        event_id: Option<&str>,
    ) -> Result<LedgerReceipt> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let _gate = self.gate()?;
        let mut batch = WriteBatch::default();
        self.stage_event(&mut batch, event_id)?;

        let mut account = self.load_account(account_id)?;
        account.credits += amount;
        account.updated_at = chrono::Utc::now();

        let tx = match kind {
            TransactionKind::Subscription => CreditTransaction::subscription(
                *account_id,
                amount,
                account.credits,
                description,
            ),
            _ => CreditTransaction::credit(
                *account_id,
                amount,
                account.credits,
                description.to_string(),
            ),
        };

        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(LedgerReceipt {
            balance: account.credits,
            transaction: tx,
        })
    }

    fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<CreditTransaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        self.db
            .get_cf(&cf, keys::transaction_key(transaction_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_transactions(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let suffixes =
            self.scan_account_index(cf::TRANSACTIONS_BY_ACCOUNT, account_id, limit, offset)?;

        let mut transactions = Vec::with_capacity(suffixes.len());
        for bytes in suffixes {
            if let Some(tx) = self.get_transaction(TransactionId::from_bytes(bytes))? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    // =========================================================================
    // Job lifecycle
    // =========================================================================

    fn create_job(&self, job: &VideoJob) -> Result<LedgerReceipt> {
        let _gate = self.gate()?;
        let mut account = self.load_account(&job.account_id)?;
        if account.credits < job.charged_credits {
            return Err(StoreError::InsufficientCredits {
                balance: account.credits,
                required: job.charged_credits,
            });
        }

        account.credits -= job.charged_credits;
        account.updated_at = chrono::Utc::now();
        let tx = CreditTransaction::debit(
            job.account_id,
            job.charged_credits,
            account.credits,
            format!(
                "Video generation ({}s, {})",
                job.duration_seconds,
                job.model.as_str()
            ),
        );

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.stage_job(&mut batch, job)?;
        self.write(batch)?;

        Ok(LedgerReceipt {
            balance: account.credits,
            transaction: tx,
        })
    }

    fn get_job(&self, job_id: JobId) -> Result<Option<VideoJob>> {
        let cf = self.cf(cf::JOBS)?;
        self.db
            .get_cf(&cf, keys::job_key(job_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_jobs(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoJob>> {
        let suffixes = self.scan_account_index(cf::JOBS_BY_ACCOUNT, account_id, limit, offset)?;

        let mut jobs = Vec::with_capacity(suffixes.len());
        for bytes in suffixes {
            if let Some(job) = self.get_job(JobId::from_bytes(bytes))? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    fn find_job_by_provider_ref(&self, provider_ref: &str) -> Result<Option<VideoJob>> {
        let cf = self.cf(cf::JOBS_BY_PROVIDER)?;
        let Some(job_id_bytes) = self
            .db
            .get_cf(&cf, keys::provider_ref_key(provider_ref))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        if job_id_bytes.len() != 16 {
            return Err(StoreError::Serialization(
                "malformed provider-ref index entry".into(),
            ));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&job_id_bytes);
        self.get_job(JobId::from_bytes(bytes))
    }

    fn mark_job_generating(&self, job_id: JobId, provider_ref: &str) -> Result<VideoJob> {
        let _gate = self.gate()?;
        let mut job = self.load_job(job_id)?;
        if !job.accept(provider_ref) {
            return Ok(job);
        }

        let cf_provider = self.cf(cf::JOBS_BY_PROVIDER)?;
        let mut batch = WriteBatch::default();
        self.stage_job(&mut batch, &job)?;
        batch.put_cf(
            &cf_provider,
            keys::provider_ref_key(provider_ref),
            job.id.to_bytes(),
        );
        self.write(batch)?;

        Ok(job)
    }

    fn update_job_progress(&self, job_id: JobId, progress: u8) -> Result<VideoJob> {
        let _gate = self.gate()?;
        let mut job = self.load_job(job_id)?;
        if !job.report_progress(progress) {
            return Ok(job);
        }

        let mut batch = WriteBatch::default();
        self.stage_job(&mut batch, &job)?;
        self.write(batch)?;

        Ok(job)
    }

    fn complete_job(&self, job_id: JobId, video_url: &str) -> Result<JobTransition> {
        let _gate = self.gate()?;
        let mut job = self.load_job(job_id)?;
        if !job.complete(video_url) {
            return Ok(JobTransition {
                job,
                applied: false,
                refund: None,
            });
        }

        let mut batch = WriteBatch::default();
        self.stage_job(&mut batch, &job)?;
        self.write(batch)?;

        Ok(JobTransition {
            job,
            applied: true,
            refund: None,
        })
    }

    fn fail_job(&self, job_id: JobId, error: &str) -> Result<JobTransition> {
        let _gate = self.gate()?;
        let mut job = self.load_job(job_id)?;
        if !job.fail(error) {
            // Already terminal: duplicate signal, no second refund.
            return Ok(JobTransition {
                job,
                applied: false,
                refund: None,
            });
        }

        let mut account = self.load_account(&job.account_id)?;
        account.credits += job.charged_credits;
        account.updated_at = chrono::Utc::now();
        let tx = CreditTransaction::refund(
            job.account_id,
            job.charged_credits,
            account.credits,
            format!("Refund for failed job {}", job.id),
        );

        let mut batch = WriteBatch::default();
        self.stage_job(&mut batch, &job)?;
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(JobTransition {
            job,
            applied: true,
            refund: Some(LedgerReceipt {
                balance: account.credits,
                transaction: tx,
            }),
        })
    }

    // =========================================================================
    // Webhook events
    // =========================================================================

    fn has_processed_event(&self, event_id: &str) -> Result<bool> {
        let cf = self.cf(cf::PROCESSED_EVENTS)?;
        Ok(self
            .db
            .get_cf(&cf, keys::event_key(event_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vykso_core::{AspectRatio, GenerationModel, JobStatus, Tier};

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn account_with_credits(store: &RocksStore, credits: i64) -> AccountId {
        let account_id = AccountId::generate();
        store.put_account(&Account::new(account_id)).unwrap();
        if credits > 0 {
            store
                .add_credits(&account_id, credits, TransactionKind::Credit, "Seed", None)
                .unwrap();
        }
        account_id
    }

    fn creator_job(account_id: AccountId) -> VideoJob {
        VideoJob::create(
            account_id,
            Tier::Creator,
            GenerationModel::Veo3Fast,
            None,
            "Street food close-ups",
            vec![],
        )
        .unwrap()
    }

    fn ledger_sum(store: &RocksStore, account_id: &AccountId) -> i64 {
        store
            .list_transactions(account_id, 1000, 0)
            .unwrap()
            .iter()
            .map(|tx| tx.amount)
            .sum()
    }

    #[test]
    fn account_crud() {
        let (store, _dir) = create_test_store();
        let account_id = AccountId::generate();

        store.put_account(&Account::new(account_id)).unwrap();
        let fetched = store.get_account(&account_id).unwrap().unwrap();
        assert_eq!(fetched.credits, 0);
        assert_eq!(fetched.plan, "free");

        store.delete_account(&account_id).unwrap();
        assert!(store.get_account(&account_id).unwrap().is_none());
        assert!(matches!(
            store.delete_account(&account_id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn debit_and_refund_conserve_the_ledger() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let receipt = store.debit(&account_id, 8, "Video job").unwrap();
        assert_eq!(receipt.balance, 92);
        assert_eq!(receipt.transaction.amount, -8);

        let receipt = store.refund(&account_id, 8, "Job failed").unwrap();
        assert_eq!(receipt.balance, 100);

        // Conservation: balance equals the sum of all transactions.
        let account = store.get_account(&account_id).unwrap().unwrap();
        assert_eq!(account.credits, ledger_sum(&store, &account_id));
    }

    #[test]
    fn debit_never_goes_negative() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 5);

        let result = store.debit(&account_id, 10, "Too big");
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 5,
                required: 10
            })
        ));

        // No partial effect: balance unchanged and only the seed recorded.
        let account = store.get_account(&account_id).unwrap().unwrap();
        assert_eq!(account.credits, 5);
        assert_eq!(store.list_transactions(&account_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn ledger_rejects_non_positive_amounts() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 10);

        assert!(matches!(
            store.debit(&account_id, 0, "zero"),
            Err(StoreError::InvalidAmount(0))
        ));
        assert!(matches!(
            store.refund(&account_id, -3, "negative"),
            Err(StoreError::InvalidAmount(-3))
        ));
    }

    #[test]
    fn add_credits_deduplicates_by_event_id() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 0);

        let receipt = store
            .add_credits(
                &account_id,
                200,
                TransactionKind::Subscription,
                "creator_pro",
                Some("evt_1"),
            )
            .unwrap();
        assert_eq!(receipt.balance, 200);

        let replay = store.add_credits(
            &account_id,
            200,
            TransactionKind::Subscription,
            "creator_pro",
            Some("evt_1"),
        );
        assert!(matches!(replay, Err(StoreError::DuplicateEvent { .. })));

        let account = store.get_account(&account_id).unwrap().unwrap();
        assert_eq!(account.credits, 200);
    }

    #[test]
    fn transactions_list_newest_first_with_pagination() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 0);

        store
            .add_credits(&account_id, 10, TransactionKind::Credit, "First", None)
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store
            .add_credits(&account_id, 20, TransactionKind::Credit, "Second", None)
            .unwrap();

        let all = store.list_transactions(&account_id, 10, 0).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].description, "Second");
        assert_eq!(all[1].description, "First");

        let page = store.list_transactions(&account_id, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].description, "First");
    }

    #[test]
    fn create_job_debits_atomically() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let job = creator_job(account_id);
        let receipt = store.create_job(&job).unwrap();
        assert_eq!(receipt.balance, 92);

        let stored = store.get_job(job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.charged_credits, 8);
    }

    #[test]
    fn create_job_with_short_balance_writes_nothing() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 5);

        let job = creator_job(account_id);
        let result = store.create_job(&job);
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 5,
                required: 8
            })
        ));

        // Neither the job nor a transaction was persisted.
        assert!(store.get_job(job.id).unwrap().is_none());
        assert_eq!(store.list_jobs(&account_id, 10, 0).unwrap().len(), 0);
        assert_eq!(store.list_transactions(&account_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn generating_and_provider_lookup() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let job = creator_job(account_id);
        store.create_job(&job).unwrap();

        let updated = store.mark_job_generating(job.id, "task-42").unwrap();
        assert_eq!(updated.status, JobStatus::Generating);

        let found = store.find_job_by_provider_ref("task-42").unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert!(store.find_job_by_provider_ref("task-unknown").unwrap().is_none());
    }

    #[test]
    fn failed_job_refunds_exactly_once() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let job = creator_job(account_id);
        store.create_job(&job).unwrap();
        store.mark_job_generating(job.id, "task-7").unwrap();
        assert_eq!(store.get_account(&account_id).unwrap().unwrap().credits, 92);

        // Provider reports failure: refund restores the balance.
        let first = store.fail_job(job.id, "provider timeout").unwrap();
        assert!(first.applied);
        assert_eq!(first.refund.unwrap().balance, 100);

        // The same failure delivered again is a no-op.
        let second = store.fail_job(job.id, "provider timeout").unwrap();
        assert!(!second.applied);
        assert!(second.refund.is_none());

        let account = store.get_account(&account_id).unwrap().unwrap();
        assert_eq!(account.credits, 100);
        assert_eq!(account.credits, ledger_sum(&store, &account_id));
    }

    #[test]
    fn completed_job_is_terminal() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let job = creator_job(account_id);
        store.create_job(&job).unwrap();
        store.mark_job_generating(job.id, "task-9").unwrap();

        let done = store.complete_job(job.id, "https://cdn/v.mp4").unwrap();
        assert!(done.applied);
        assert_eq!(done.job.progress, 100);

        // A late failure signal must not claw back or refund anything.
        let late_fail = store.fail_job(job.id, "late error").unwrap();
        assert!(!late_fail.applied);

        let stored = store.get_job(job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.video_url.as_deref(), Some("https://cdn/v.mp4"));
        assert_eq!(store.get_account(&account_id).unwrap().unwrap().credits, 92);
    }

    #[test]
    fn progress_updates_only_before_terminal() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let job = creator_job(account_id);
        store.create_job(&job).unwrap();
        store.mark_job_generating(job.id, "task-3").unwrap();

        let updated = store.update_job_progress(job.id, 55).unwrap();
        assert_eq!(updated.progress, 55);

        store.complete_job(job.id, "https://cdn/v.mp4").unwrap();
        let after = store.update_job_progress(job.id, 10).unwrap();
        assert_eq!(after.progress, 100);
    }

    #[test]
    fn plan_change_flips_tier_without_touching_balance() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let account = store
            .apply_plan_change(&account_id, "pro_pro", Some("cus_1"), Some("sub_1"), Some("evt_plan_1"))
            .unwrap();
        assert_eq!(account.tier, Tier::Professional);
        assert_eq!(account.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(account.credits, 100);
        assert_eq!(account.billing_customer_ref.as_deref(), Some("cus_1"));

        // Replay is rejected before any write.
        let replay =
            store.apply_plan_change(&account_id, "pro_pro", None, None, Some("evt_plan_1"));
        assert!(matches!(replay, Err(StoreError::DuplicateEvent { .. })));
    }

    #[test]
    fn account_lookup_by_subscription_ref() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 0);

        store
            .apply_plan_change(&account_id, "creator_basic", None, Some("sub_42"), None)
            .unwrap();

        let found = store
            .find_account_by_subscription_ref("sub_42")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, account_id);
        assert!(store
            .find_account_by_subscription_ref("sub_missing")
            .unwrap()
            .is_none());
    }

    #[test]
    fn jobs_list_newest_first() {
        let (store, _dir) = create_test_store();
        let account_id = account_with_credits(&store, 100);

        let first = creator_job(account_id);
        store.create_job(&first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = creator_job(account_id);
        store.create_job(&second).unwrap();

        let jobs = store.list_jobs(&account_id, 10, 0).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);
    }
}
