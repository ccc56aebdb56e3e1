mod errors;
mod loan_service;
mod outcome;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{
    ServiceDependencies, borrow, borrow_book, delete, delete_loan, find_loan, give_back,
    loans_for_member, renew, renew_loan, return_book,
};
pub use outcome::Outcome;
