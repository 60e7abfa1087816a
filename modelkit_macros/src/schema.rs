use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, Path};

struct SchemaArgs {
    table: Option<String>,
    primary_key: Option<String>,
    computed: Option<Path>,
}

pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let args = match extract_args(&input) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let table = args
        .table
        .unwrap_or_else(|| format!("{}s", to_snake_case(&name.to_string())));
    let primary_key = args.primary_key.unwrap_or_else(|| "id".to_string());

    let computed = args.computed.map(|path| {
        quote! {
            fn computed_fields() -> ::modelkit::ComputedFields<Self> {
                #path()
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::modelkit::Schema for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const PRIMARY_KEY: &'static str = #primary_key;

            #computed
        }
    };

    TokenStream::from(expanded)
}

fn extract_args(input: &DeriveInput) -> syn::Result<SchemaArgs> {
    let mut args = SchemaArgs {
        table: None,
        primary_key: None,
        computed: None,
    };

    for attr in &input.attrs {
        if !attr.path().is_ident("schema") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                args.table = Some(value.value());
            } else if meta.path.is_ident("primary_key") {
                let value: LitStr = meta.value()?.parse()?;
                args.primary_key = Some(value.value());
            } else if meta.path.is_ident("computed") {
                args.computed = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("expected `table`, `primary_key` or `computed`"));
            }
            Ok(())
        })?;
    }

    Ok(args)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
