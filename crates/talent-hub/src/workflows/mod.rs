pub mod requisition;
