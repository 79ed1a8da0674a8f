/// Path of the `ut_meta` crate as seen from the caller.
///
/// 1. Crates depending on `ut_meta` get `::ut_meta`.
/// 2. Crates depending on the `ut` facade get `::ut::meta`.
/// 3. Otherwise `::ut_meta`, which `ut_meta` itself resolves through
///    `extern crate self`.
///
/// Reading the manifest is not free: derive entry points resolve the path
/// once and pass it down.
pub(crate) fn ut_meta() -> syn::Path {
    ut_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("ut_meta"))
}
