//! Procedural macros for mini-flux

use darling::util::PathList;
use darling::{FromDeriveInput, FromField, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(struct_any, enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Explicit action name (structs only)
    #[darling(default)]
    name: Option<String>,

    /// Extra routing tags, e.g. `tags(Silent)`
    #[darling(default)]
    tags: PathList,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit name override for this variant
    #[darling(default)]
    name: Option<String>,
}

/// Derive macro for the Action trait
///
/// Generates `name()`, `tags()` and `as_any()`. The name is the struct name,
/// or the variant name for enums. Tags always include the type itself;
/// `#[action(tags(...))]` adds capability markers.
///
/// # Example
/// ```ignore
/// #[derive(Action, Debug)]
/// struct LoadPersonsAction {
///     count: usize,
/// }
///
/// #[derive(Action, Debug)]
/// #[action(tags(Silent))]
/// enum LifecycleAction {
///     Started,
///     #[action(name = "Stopping")]
///     Stopped { reason: String },
/// }
///
/// assert_eq!(LoadPersonsAction { count: 1 }.name(), "LoadPersonsAction");
/// assert_eq!(LifecycleAction::Started.name(), "Started");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let name_body = match &opts.data {
        darling::ast::Data::Struct(_) => {
            let action_name = opts.name.clone().unwrap_or_else(|| name.to_string());
            quote! { #action_name }
        }
        darling::ast::Data::Enum(variants) => {
            if opts.name.is_some() {
                return syn::Error::new_spanned(
                    &input.ident,
                    "`name` on an enum is not supported, set it per variant",
                )
                .to_compile_error()
                .into();
            }
            let name_arms = variants.iter().map(|v| {
                let variant_name = &v.ident;
                let variant_str = v.name.clone().unwrap_or_else(|| variant_name.to_string());

                match &v.fields.style {
                    darling::ast::Style::Unit => quote! {
                        #name::#variant_name => #variant_str
                    },
                    darling::ast::Style::Tuple => quote! {
                        #name::#variant_name(..) => #variant_str
                    },
                    darling::ast::Style::Struct => quote! {
                        #name::#variant_name { .. } => #variant_str
                    },
                }
            });
            if variants.is_empty() {
                quote! { match *self {} }
            } else {
                quote! {
                    match self {
                        #(#name_arms),*
                    }
                }
            }
        }
    };

    let tags = opts.tags.iter();

    let expanded = quote! {
        impl #impl_generics ::mini_flux::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                #name_body
            }

            fn tags(&self) -> ::mini_flux::Tags {
                ::mini_flux::Tags::of::<Self>()
                    #(.with::<#tags>())*
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }
    };

    TokenStream::from(expanded)
}

/// Container-level attributes for #[derive(DebugState)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(debug), supports(struct_named))]
struct DebugStateOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<(), DebugField>,

    /// Title of the section holding fields without an explicit section
    #[darling(default)]
    section: Option<String>,
}

/// Field-level attributes
#[derive(Debug, FromField)]
#[darling(attributes(debug))]
struct DebugField {
    ident: Option<syn::Ident>,

    /// Section this field is listed under
    #[darling(default)]
    section: Option<String>,

    /// Entry key, defaults to the field name
    #[darling(default)]
    label: Option<String>,

    /// Leave the field out
    #[darling(default)]
    skip: bool,

    /// Render with `{:?}` instead of `Display`
    #[darling(default)]
    debug_fmt: bool,

    /// Render with a function `fn(&T) -> String`
    #[darling(default)]
    with: Option<syn::Path>,
}

/// Derive macro for the DebugState trait
///
/// Fields render with `Display` unless marked otherwise. Sections appear in
/// order of first use; fields without a section go to one titled after the
/// struct (or the container's `#[debug(section = "...")]`).
///
/// # Example
/// ```ignore
/// #[derive(DebugState)]
/// struct PersonState {
///     #[debug(section = "Persons", with = "count_persons")]
///     persons: Option<Vec<Person>>,
///     #[debug(section = "Persons", debug_fmt)]
///     load_persons_task: Task,
///     #[debug(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(DebugState, attributes(debug))]
pub fn derive_debug_state(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match DebugStateOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();
    let default_section = opts.section.clone().unwrap_or_else(|| name.to_string());

    let fields = match &opts.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return syn::Error::new_spanned(&input, "DebugState can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    // Group fields by section, keeping first-use order
    let mut sections: Vec<(String, Vec<proc_macro2::TokenStream>)> = Vec::new();
    for field in fields.iter().filter(|f| !f.skip) {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let key = field.label.clone().unwrap_or_else(|| ident.to_string());
        let value = if let Some(with) = &field.with {
            quote! { #with(&self.#ident) }
        } else if field.debug_fmt {
            quote! { ::std::format!("{:?}", self.#ident) }
        } else {
            quote! { ::std::string::ToString::to_string(&self.#ident) }
        };
        let entry = quote! { section.push_entry(#key, #value); };

        let title = field.section.clone().unwrap_or_else(|| default_section.clone());
        match sections.iter_mut().find(|(t, _)| *t == title) {
            Some((_, entries)) => entries.push(entry),
            None => sections.push((title, vec![entry])),
        }
    }

    let section_blocks = sections.iter().map(|(title, entries)| {
        quote! {
            {
                let mut section = ::mini_flux::debug::DebugSection::new(#title);
                #(#entries)*
                sections.push(section);
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics ::mini_flux::debug::DebugState for #name #ty_generics #where_clause {
            fn debug_sections(&self) -> ::std::vec::Vec<::mini_flux::debug::DebugSection> {
                #[allow(unused_mut)]
                let mut sections = ::std::vec::Vec::new();
                #(#section_blocks)*
                sections
            }
        }
    };

    TokenStream::from(expanded)
}
