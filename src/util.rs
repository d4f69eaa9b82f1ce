//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single pass, so placeholder-looking text inside a value is left alone.
/// Unknown placeholders are kept verbatim.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(start) = rest.find('{') {
    out.push_str(&rest[..start]);
    let after = &rest[start + 1..];
    let hit = after.find('}').and_then(|end| {
      let key = &after[..end];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (end, *v))
    });
    match hit {
      Some((end, value)) => {
        out.push_str(value);
        rest = &after[end + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Strip a surrounding Markdown code fence (```json ... ```) if present.
pub fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  let Some(inner) = t.strip_prefix("```") else { return t };
  let Some(inner) = inner.strip_suffix("```") else { return t };
  // Drop the info string ("json") on the opening line, or glued to the body
  // when the whole fence sits on one line.
  match inner.find('\n') {
    Some(nl) => inner[nl + 1..].trim(),
    None => inner.trim().trim_start_matches(|c: char| c.is_ascii_alphanumeric()).trim(),
  }
}

/// Log-safe truncation for large strings, on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_known_keys_only() {
    let out = fill_template("Hi {name}, {unknown} {name}!", &[("name", "Ada")]);
    assert_eq!(out, "Hi Ada, {unknown} Ada!");
  }

  #[test]
  fn values_are_not_re_expanded() {
    let out = fill_template("{a} / {b}", &[("a", "{b}"), ("b", "B")]);
    assert_eq!(out, "{b} / B");
  }

  #[test]
  fn tolerates_stray_braces() {
    assert_eq!(fill_template("fn f() { {x} }", &[("x", "1")]), "fn f() { 1 }");
    assert_eq!(fill_template("open {", &[]), "open {");
  }

  #[test]
  fn strips_fences() {
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    assert_eq!(strip_code_fence("```{}```"), "{}");
    assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("``` json [1, 2] ```"), "[1, 2]");
  }

  #[test]
  fn truncates_on_char_boundary() {
    let s = "ééééé";
    let t = trunc_for_log(s, 3);
    assert!(t.starts_with('é'));
    assert!(t.ends_with("(10 bytes total)"));
  }
}
