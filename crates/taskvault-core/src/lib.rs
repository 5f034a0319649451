//! Core contracts for Taskvault: the document store boundary, its error
//! taxonomy and the reports storage operations hand back to callers.
//! No I/O or cryptography lives here.

pub mod storage;
