pub mod clock;
pub mod inventory_ledger;
pub mod loan_store;
pub mod store_error;

pub use clock::Clock;
pub use inventory_ledger::InventoryLedger;
pub use loan_store::LoanStore;
pub use store_error::StoreError;
