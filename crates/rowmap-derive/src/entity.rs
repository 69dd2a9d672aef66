use darling::{Error as DarlingError, FromDeriveInput, FromField, ast::Data, util::Ignored};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, GenericArgument, Generics, Ident, PathArguments, Type};

///
/// EntityInput
///

#[derive(FromDeriveInput)]
#[darling(attributes(mapper), supports(struct_named))]
struct EntityInput {
    ident: Ident,
    generics: Generics,
    data: Data<Ignored, EntityField>,

    /// Diagnostic name; defaults to the struct ident.
    #[darling(default)]
    name: Option<String>,
}

///
/// EntityField
///

#[derive(FromField)]
#[darling(attributes(mapper))]
struct EntityField {
    ident: Option<Ident>,
    ty: Type,

    #[darling(default)]
    primary_key: Option<String>,

    #[darling(default)]
    column: Option<String>,

    #[darling(default)]
    read_only: bool,

    #[darling(default)]
    relation: bool,
}

///
/// FieldRole
///

enum FieldRole<'a> {
    PrimaryKey(&'a str),
    Column(&'a str),
    ReadOnly(&'a str),
    Relation(&'a Type),
    Ignored,
}

impl EntityField {
    fn role(&self) -> Result<FieldRole<'_>, DarlingError> {
        let declared = [
            self.primary_key.is_some(),
            self.column.is_some(),
            self.relation,
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        if declared > 1 {
            return Err(DarlingError::custom(
                "a field may be only one of `primary_key`, `column` or `relation`",
            )
            .with_span(&self.ty));
        }
        if self.read_only && self.column.is_none() {
            return Err(
                DarlingError::custom("`read_only` requires `column = \"...\"`").with_span(&self.ty),
            );
        }

        let role = if let Some(column) = &self.primary_key {
            FieldRole::PrimaryKey(column)
        } else if let Some(column) = &self.column {
            if self.read_only {
                FieldRole::ReadOnly(column)
            } else {
                FieldRole::Column(column)
            }
        } else if self.relation {
            FieldRole::Relation(relation_target(&self.ty))
        } else {
            FieldRole::Ignored
        };

        Ok(role)
    }
}

// derive_entity
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match EntityInput::from_derive_input(&input).and_then(|entity| expand(&entity)) {
        Ok(tokens) => tokens,
        Err(err) => err.write_errors(),
    }
}

fn expand(input: &EntityInput) -> Result<TokenStream, DarlingError> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let entity_name = input.name.clone().unwrap_or_else(|| ident.to_string());

    let Data::Struct(fields) = &input.data else {
        return Err(DarlingError::unsupported_shape("enum").with_span(ident));
    };

    let mut errors = DarlingError::accumulator();
    let mut declarations = Vec::new();
    for field in fields.iter() {
        let Some(role) = errors.handle(field.role()) else {
            continue;
        };
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let field_name = field_ident.to_string();
        let ty = &field.ty;

        let declaration = match role {
            FieldRole::PrimaryKey(column) => quote! {
                builder.primary_key(#column, #field_name, |entity| &mut entity.#field_ident);
            },
            FieldRole::Column(column) => quote! {
                builder.column(#column, #field_name, |entity| &mut entity.#field_ident);
            },
            FieldRole::ReadOnly(column) => quote! {
                builder.read_only::<#ty>(#column, #field_name);
            },
            FieldRole::Relation(target) => quote! {
                builder.relation::<#target, _>(#field_name, |entity| &mut entity.#field_ident);
            },
            FieldRole::Ignored => continue,
        };
        declarations.push(declaration);
    }
    errors.finish()?;

    Ok(quote! {
        impl #impl_generics ::rowmap::traits::Entity for #ident #ty_generics #where_clause {
            const ENTITY_NAME: &'static str = #entity_name;
            const PATH: &'static str = ::core::concat!(
                ::core::module_path!(),
                "::",
                ::core::stringify!(#ident)
            );

            fn describe(builder: &mut ::rowmap::model::DescriptorBuilder<Self>) {
                #(#declarations)*
            }
        }
    })
}

// Peel `Option`, `Vec` and `Box` layers down to the related entity type.
fn relation_target(ty: &Type) -> &Type {
    let mut current = ty;
    while let Some(inner) = wrapper_argument(current) {
        current = inner;
    }

    current
}

fn wrapper_argument(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if !["Option", "Vec", "Box"]
        .iter()
        .any(|wrapper| segment.ident == wrapper)
    {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}

///
/// TESTS
///
