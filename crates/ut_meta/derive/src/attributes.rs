use syn::{Attribute, Field, Ident, LitStr};

const REFLECT: &str = "reflect";
const POLYMORPHIC: &str = "polymorphic";

/// `#[reflect(...)]` on a field.
#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub name: Option<String>,
    pub skip: bool,
}

impl FieldAttributes {
    pub fn parse(field: &Field) -> syn::Result<Self> {
        let mut attributes = Self::default();
        for attr in reflect_attrs(&field.attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    attributes.skip = true;
                    return Ok(());
                }
                if meta.path.is_ident("name") {
                    let name: LitStr = meta.value()?.parse()?;
                    if name.value().is_empty() {
                        return Err(meta.error("child names cannot be empty"));
                    }
                    attributes.name = Some(name.value());
                    return Ok(());
                }
                Err(meta.error("unknown field attribute, expected `name` or `skip`"))
            })?;
        }
        Ok(attributes)
    }
}

/// `#[reflect(...)]` on a type.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub on_event: Option<Ident>,
}

impl TypeAttributes {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut attributes = Self::default();
        for attr in reflect_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("on_event") {
                    let method: LitStr = meta.value()?.parse()?;
                    attributes.on_event = Some(method.parse()?);
                    return Ok(());
                }
                Err(meta.error("unknown type attribute, expected `on_event`"))
            })?;
        }
        Ok(attributes)
    }
}

/// Value of `#[polymorphic(name = "...")]`.
pub(crate) fn polymorphic_name(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident(POLYMORPHIC)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
                return Ok(());
            }
            Err(meta.error("unknown attribute, expected `name`"))
        })?;
    }
    Ok(name)
}

fn reflect_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident(REFLECT))
}
