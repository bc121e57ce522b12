use proc_macro::TokenStream;
use quote::quote;
use syn::{Item, ItemFn, Type, parse_macro_input, parse_quote};

/// Adds `Send + Sync` bounds so the annotated item can cross task boundaries.
///
/// - On a trait definition, `Send + Sync` are appended to its supertraits.
/// - On a type alias of a trait object (`type F = dyn Fn(..) -> ..;`), the bounds are
///   appended to the trait object.
#[proc_macro_attribute]
pub fn thread_safe(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as Item);

    match input {
        Item::Type(mut item) => {
            let bounded: Type = match &*item.ty {
                Type::TraitObject(trait_obj) => {
                    let mut trait_obj = trait_obj.clone();
                    trait_obj.bounds.push(parse_quote!(Send));
                    trait_obj.bounds.push(parse_quote!(Sync));
                    Type::TraitObject(trait_obj)
                }
                other => {
                    return syn::Error::new_spanned(
                        other,
                        "thread_safe on a type alias expects a `dyn Trait` object",
                    )
                    .to_compile_error()
                    .into();
                }
            };
            item.ty = Box::new(bounded);
            quote! { #item }.into()
        }
        Item::Trait(mut item) => {
            item.supertraits.push(parse_quote!(Send));
            item.supertraits.push(parse_quote!(Sync));
            if item.colon_token.is_none() {
                item.colon_token = Some(Default::default());
            }
            quote! { #item }.into()
        }
        other => syn::Error::new_spanned(
            quote! { #other },
            "thread_safe can only be applied to type aliases or trait definitions",
        )
        .to_compile_error()
        .into(),
    }
}

/// Shorthand for `#[async_trait::async_trait]` on behavior traits and their impls.
#[proc_macro_attribute]
pub fn async_behavior(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_item = parse_macro_input!(item as Item);

    let output = quote! {
        #[async_trait::async_trait]
        #input_item
    };

    output.into()
}

/// Runs an async test on tokio with `env_logger` initialised in test mode.
#[proc_macro_attribute]
pub fn logged_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_inputs = &input_fn.sig.inputs;
    let fn_output = &input_fn.sig.output;
    let fn_body = &input_fn.block;
    let fn_attrs = &input_fn.attrs;

    if input_fn.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&input_fn.sig, "logged_test expects an async fn")
            .to_compile_error()
            .into();
    }

    let output = quote! {
        #(#fn_attrs)*
        #[tokio::test]
        #fn_vis async fn #fn_name(#fn_inputs) #fn_output {
            let _ = env_logger::builder().is_test(true).try_init();
            #fn_body
        }
    };

    output.into()
}
