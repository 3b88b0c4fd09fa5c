use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput};

pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as DeriveInput);
    let name = parsed.ident;
    let data = match parsed.data {
        Data::Struct(data) => data,
        _ => panic!("expected a struct"),
    };

    let mut initializers = TokenStream2::new();
    let mut writers = TokenStream2::new();

    for field in data.fields {
        let name = field.ident.expect("expected valid field name");
        let field_ty = field.ty;

        initializers.extend(quote! {
            #name: <#field_ty as ::tomb_utils::packed::PackedData>::read_packed(r)? ,
        });

        writers.extend(quote! {
            ::tomb_utils::packed::PackedData::write_packed(&self.#name, w)?;
        });
    }

    quote! {
        impl ::tomb_utils::packed::PackedData for #name {
            fn read_packed<R: ::std::io::Read>(
                r: &mut R,
            ) -> ::tomb_utils::AnyResult<Self> {
                Ok(Self {
                    #initializers
                })
            }

            fn write_packed<W: ::std::io::Write>(
                &self,
                w: &mut W,
            ) -> ::tomb_utils::AnyResult {
                #writers
                Ok(())
            }
        }
    }
    .into()
}
