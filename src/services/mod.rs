pub mod completion;
pub mod proposals;
pub mod reservation;

pub use completion::CompletionService;
pub use proposals::{CounterInput, ListRole, ProposalService, ProposeInput};
pub use reservation::ReservationService;
