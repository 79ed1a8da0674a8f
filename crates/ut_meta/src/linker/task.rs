use alloc::string::String;

use ut_ptr::Address;

use crate::controller::State;
use crate::parameter::ParameterRef;

/// Deferred work created by pointer parameters during a traversal.
pub(crate) enum Task<'a> {
    /// Writes the id of the node observing `address` into a reserved slot.
    Write {
        state: State,
        address: Address,
        type_name: String,
    },
    /// Writes the id of the shared object at `address` into a reserved slot.
    WriteShared {
        state: State,
        address: Address,
        weak: bool,
    },
    /// Links `parameter` to the value of the node `id`.
    Read { parameter: ParameterRef<'a>, id: u32 },
    /// Links `parameter` to the shared object `id`.
    ReadShared {
        parameter: ParameterRef<'a>,
        id: u32,
        weak: bool,
    },
}
