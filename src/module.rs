use base64::{engine::general_purpose, Engine as _};
use miette::Diagnostic;
use tera::{Context, Tera};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("Error occurred attempting to render module template")]
    #[diagnostic(code(wasm2ts::module::render))]
    Render {
        #[source]
        source: tera::Error,
    },

    #[error("no `const base64 = \"...\"` literal found in generated module")]
    #[diagnostic(
        code(wasm2ts::module::missing_literal),
        help("The file was probably edited by hand; re-run the conversion")
    )]
    MissingLiteral,

    #[error("embedded literal is not valid base64")]
    #[diagnostic(code(wasm2ts::module::decode))]
    Decode {
        #[source]
        source: base64::DecodeError,
    },
}

/// Extension appended to the wasm file name to form the module file name.
pub const DEFAULT_MODULE_EXTENSION: &str = "ts";

const MODULE_TEMPLATE: &str = r#"
  /* Autogenerated file. Do not edit manually. */
  /* eslint-disable eslint-comments/disable-enable-pair */
  /* eslint-disable eslint-comments/no-unlimited-disable */
  /* eslint-disable */
  /* prettier-ignore */
  const base64 = "{{ base64 }}";
  const wasm = new Uint8Array(Buffer.from(base64, 'base64'));
  export default wasm;
"#;

/// Standard, padded base64.
pub fn encode(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Renders the TypeScript module that rebuilds `bytes` as a default-exported `Uint8Array`.
pub fn render_module(bytes: &[u8]) -> Result<String, TemplateError> {
    let mut ctx = Context::new();
    ctx.insert("base64", &encode(bytes));

    Tera::one_off(MODULE_TEMPLATE, &ctx, false)
        .map_err(|error| TemplateError::Render { source: error })
}

/// Finds the base64 literal inside a module produced by [`render_module`].
pub fn extract_base64(module: &str) -> Option<&str> {
    lazy_static::lazy_static! {
        static ref BASE64_LITERAL_REGEX: regex::Regex = regex::Regex::new(
            r#"const base64 = "([A-Za-z0-9+/]*={0,2})";"#
        ).expect("a valid regex pattern");
    }

    BASE64_LITERAL_REGEX
        .captures(module)
        .and_then(|captures| captures.get(1))
        .map(|literal| literal.as_str())
}

/// Recovers the original bytes from a generated module.
pub fn decode_module(module: &str) -> Result<Vec<u8>, TemplateError> {
    let literal = extract_base64(module).ok_or(TemplateError::MissingLiteral)?;

    general_purpose::STANDARD
        .decode(literal)
        .map_err(|error| TemplateError::Decode { source: error })
}
