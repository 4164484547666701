//! Attribute macro that registers a function as a `#[test_case]` driven by
//! the kernel's `custom_test_frameworks` runner.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn};

/// Wraps a `fn()` body so it can be collected into `&[&test_types::UnitTest]`
/// by the `custom_test_frameworks` harness.
///
/// ```ignore
/// #[kernel_test]
/// fn elects_highest_counter() { ... }
/// ```
#[proc_macro_attribute]
pub fn kernel_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let name = &input.sig.ident;
    let inner_name = format_ident!("__{}_body", name);
    let name_str = name.to_string();

    let mut inner = input.clone();
    inner.sig.ident = inner_name.clone();

    let expanded = quote! {
        #inner

        #[test_case]
        const #name: test_types::UnitTest = test_types::UnitTest {
            name: #name_str,
            test_func: #inner_name,
        };
    };

    expanded.into()
}
