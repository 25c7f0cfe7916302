pub mod dist_grid;
pub mod halo;
pub mod stencil;

pub use dist_grid::DistGrid3D;
pub use halo::{BoundaryFn, HaloExchange, HaloTicket};
pub use stencil::{OffDiag, StencilOperator};
