pub mod critical_stock;
pub mod legal_document;
pub mod order_cancelled;
pub mod overdue_sweep;
pub mod store_reopened;
