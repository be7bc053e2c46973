use proc_macro::TokenStream;
use proc_macro2::TokenTree;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Ident, LitStr, Type, parse_macro_input};

/// Derive the `Binary` trait, providing wire-layout reflection.
///
/// # Structs
///
/// Fields are written in declaration order. Integer fields may supply the
/// element count of a later `String`, `Vec<T>` or `Option` of one:
///
/// ```ignore
/// #[derive(Default, Binary)]
/// struct Header {
///     version: u8,
///     #[sbin(len_of = "client_id")]
///     client_id_len: u16,
///     client_id: String,
///     #[sbin(skip)]
///     cache: Option<std::sync::Arc<Decoded>>,
///     _reserved: u32, // `_` fields are private and never encoded
/// }
/// ```
///
/// Tuple structs name their fields by index: `#[sbin(len_of = "1")]`.
///
/// # Custom layout
///
/// With `#[sbin(custom)]` on the type, the type's `CustomCodec`
/// implementation replaces default traversal. This also works for enums.
///
/// ```ignore
/// #[derive(Default, Binary)]
/// #[sbin(custom)]
/// struct VarU32(u32);
/// ```
#[proc_macro_derive(Binary, attributes(sbin))]
pub fn derive_binary(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let custom = match parse_container_attrs(&input) {
        Ok(custom) => custom,
        Err(err) => return err.to_compile_error().into(),
    };

    let expanded = if custom {
        Ok(expand_custom(&input))
    } else {
        expand_aggregate(&input)
    };

    expanded.unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Returns `true` if the type carries `#[sbin(custom)]`.
fn parse_container_attrs(input: &DeriveInput) -> syn::Result<bool> {
    let mut custom = false;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("sbin")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("custom") {
                custom = true;
                Ok(())
            } else {
                Err(meta.error("unknown sbin container attribute, expected `custom`"))
            }
        })?;
    }
    Ok(custom)
}

fn expand_custom(input: &DeriveInput) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let name_str = name.to_string();
    let generics = with_static_params(input, Vec::new());
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics ::sbin::Binary for #name #ty_generics #where_clause {
            fn shape() -> ::sbin::Shape {
                ::sbin::Shape::Custom { type_name: #name_str }
            }

            fn view(&self) -> ::sbin::View<'_> {
                ::sbin::View::Custom(self)
            }

            fn view_mut(&mut self) -> ::sbin::ViewMut<'_> {
                ::sbin::ViewMut::Custom(self)
            }
        }
    }
}

/// One declared field, after attribute parsing.
struct FieldDef {
    /// `name` for named fields, `0`, `1`, ... for tuple fields.
    member: proc_macro2::TokenStream,
    name: String,
    ty: Type,
    exported: bool,
    skip: bool,
    len_of: Option<LitStr>,
}

impl FieldDef {
    fn on_wire(&self) -> bool {
        self.exported && !self.skip
    }
}

fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<FieldDef>> {
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Binary can only be derived for structs; use #[sbin(custom)] for other types",
            ));
        }
    };

    let mut defs = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let (member, name) = match &field.ident {
            Some(ident) => (ident.to_token_stream(), ident.to_string()),
            None => (syn::Index::from(i).to_token_stream(), i.to_string()),
        };
        let mut def = FieldDef {
            member,
            // Skip fields starting with `_`, they are private to the type
            exported: !name.starts_with('_'),
            name,
            ty: field.ty.clone(),
            skip: false,
            len_of: None,
        };

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("sbin")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    def.skip = true;
                    Ok(())
                } else if meta.path.is_ident("len_of") {
                    def.len_of = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error(
                        "unknown sbin field attribute, expected `skip` or `len_of = \"field\"`",
                    ))
                }
            })?;
        }
        defs.push(def);
    }

    Ok(defs)
}

/// Resolves every `len_of` to the declaration index of its target.
fn resolve_targets(defs: &[FieldDef]) -> syn::Result<Vec<Option<usize>>> {
    let mut targets = vec![None; defs.len()];
    let mut designated_by: Vec<Option<&str>> = vec![None; defs.len()];

    for (i, def) in defs.iter().enumerate() {
        let Some(lit) = &def.len_of else {
            continue;
        };
        let wanted = lit.value();
        let Some(target) = defs.iter().position(|s| s.name == wanted) else {
            return Err(syn::Error::new(
                lit.span(),
                format!("`len_of` names `{wanted}`, which is not a field of this struct"),
            ));
        };

        if !def.on_wire() {
            return Err(syn::Error::new(
                lit.span(),
                format!("`{}` is not encoded and cannot be a length designator", def.name),
            ));
        }
        if target <= i {
            return Err(syn::Error::new(
                lit.span(),
                format!("`{}` must be declared before its target `{wanted}`", def.name),
            ));
        }
        if !defs[target].on_wire() {
            return Err(syn::Error::new(
                lit.span(),
                format!("`{wanted}` is not encoded and cannot take a length"),
            ));
        }
        if let Some(previous) = designated_by[target].replace(def.name.as_str()) {
            return Err(syn::Error::new(
                lit.span(),
                format!("`{wanted}` already takes its length from `{previous}`"),
            ));
        }
        targets[i] = Some(target);
    }
    Ok(targets)
}

fn expand_aggregate(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    let defs = collect_fields(input)?;
    let targets = resolve_targets(&defs)?;

    let type_params: Vec<Ident> = input
        .generics
        .type_params()
        .map(|p| p.ident.clone())
        .collect();
    let bounded: Vec<&Type> = defs
        .iter()
        .filter(|s| s.on_wire() && mentions_any(&s.ty, &type_params))
        .map(|s| &s.ty)
        .collect();
    let generics = with_static_params(input, bounded);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let (plain_impl_generics, plain_ty_generics, plain_where_clause) =
        input.generics.split_for_impl();

    let infos = defs.iter().zip(&targets).enumerate().map(|(i, (def, target))| {
        let fname = &def.name;
        let private = (!def.exported).then(|| quote! { .private() });
        let excluded = def.skip.then(|| quote! { .excluded() });
        let length_of = target.map(|t| quote! { .length_of(#t) });
        quote! {
            ::sbin::FieldInfo::new(#fname, #i) #private #excluded #length_of
        }
    });

    let shapes = defs.iter().enumerate().map(|(i, def)| {
        let ty = &def.ty;
        if def.on_wire() {
            quote! {
                ::sbin::Field {
                    info: Self::__SBIN_FIELDS[#i],
                    shape: ::core::option::Option::Some(<#ty as ::sbin::Binary>::shape()),
                }
            }
        } else {
            quote! {
                ::sbin::Field {
                    info: Self::__SBIN_FIELDS[#i],
                    shape: ::core::option::Option::None,
                }
            }
        }
    });

    // Type-level checks for designators and their targets
    let assertions = defs.iter().zip(&targets).filter_map(|(def, target)| {
        let target = (*target)?;
        let designator_ty = &def.ty;
        let target_ty = &defs[target].ty;
        Some(quote! {
            ::sbin::__private::assert_designator::<#designator_ty>();
            ::sbin::__private::assert_length_target::<#target_ty>();
        })
    });

    let wire: Vec<(usize, &FieldDef)> = defs
        .iter()
        .enumerate()
        .filter(|(_, s)| s.on_wire())
        .collect();

    let field_arms = wire.iter().map(|(i, def)| {
        let member = &def.member;
        quote! {
            #i => ::core::option::Option::Some(&self.#member as &dyn ::sbin::Binary)
        }
    });

    let field_mut_arms = wire.iter().map(|(i, def)| {
        let member = &def.member;
        quote! {
            #i => ::core::option::Option::Some(&mut self.#member as &mut dyn ::sbin::Binary)
        }
    });

    let (field_match, field_mut_match) = if wire.is_empty() {
        (
            quote! { { let _ = index; ::core::option::Option::None } },
            quote! { { let _ = index; ::core::option::Option::None } },
        )
    } else {
        (
            quote! { match index { #(#field_arms,)* _ => ::core::option::Option::None } },
            quote! { match index { #(#field_mut_arms,)* _ => ::core::option::Option::None } },
        )
    };

    Ok(quote! {
        impl #plain_impl_generics #name #plain_ty_generics #plain_where_clause {
            #[doc(hidden)]
            const __SBIN_FIELDS: &'static [::sbin::FieldInfo] = &[#(#infos),*];
        }

        impl #impl_generics ::sbin::Binary for #name #ty_generics #where_clause {
            fn shape() -> ::sbin::Shape {
                #(#assertions)*
                ::sbin::Shape::Aggregate(::sbin::AggregateShape::new(
                    #name_str,
                    ::std::vec![#(#shapes),*],
                ))
            }

            fn view(&self) -> ::sbin::View<'_> {
                ::sbin::View::Aggregate(self)
            }

            fn view_mut(&mut self) -> ::sbin::ViewMut<'_> {
                ::sbin::ViewMut::Aggregate(self)
            }
        }

        impl #impl_generics ::sbin::Aggregate for #name #ty_generics #where_clause {
            fn aggregate_name(&self) -> &'static str {
                #name_str
            }

            fn field_infos(&self) -> &'static [::sbin::FieldInfo] {
                Self::__SBIN_FIELDS
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn ::sbin::Binary> {
                #field_match
            }

            fn field_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn ::sbin::Binary> {
                #field_mut_match
            }
        }
    })
}

/// Clones the generics, requiring `'static` for every type parameter and
/// `Binary` for every field type in `bounded`.
fn with_static_params(input: &DeriveInput, bounded: Vec<&Type>) -> syn::Generics {
    let mut generics = input.generics.clone();
    let params: Vec<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause
            .predicates
            .push(syn::parse_quote!(#param: 'static));
    }
    for ty in bounded {
        where_clause
            .predicates
            .push(syn::parse_quote!(#ty: ::sbin::Binary));
    }
    generics
}

/// Returns `true` if `ty` mentions any of the given type parameters.
fn mentions_any(ty: &Type, params: &[Ident]) -> bool {
    fn walk(tokens: proc_macro2::TokenStream, params: &[Ident]) -> bool {
        tokens.into_iter().any(|token| match token {
            TokenTree::Ident(ident) => params.contains(&ident),
            TokenTree::Group(group) => walk(group.stream(), params),
            _ => false,
        })
    }
    !params.is_empty() && walk(ty.to_token_stream(), params)
}
