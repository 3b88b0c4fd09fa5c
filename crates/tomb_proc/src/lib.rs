use proc_macro::TokenStream;

mod m_packed_data;

/// Implements the [`tomb_utils::PackedData`] trait on given type.
///
/// All fields must implement `PackedData`. The generated implementation reads
/// and writes struct fields in order of definition, little endian, with no
/// padding between fields - exactly the layout the legacy level files use for
/// their flat records.
///
/// *(Note, at the moment tuple structs and enums are not supported)*
#[proc_macro_derive(PackedData)]
pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    m_packed_data::packed_data_derive(input)
}
