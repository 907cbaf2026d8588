// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `String` (and, by table reuse, `HtmlSafeString`): UTF-8 text with a
//! method set that distinguishes byte and character offsets where the
//! source language does.

use lazy_static::lazy_static;
use regex::Regex;

use super::{build_table, check_arity, expect_number, expect_str, Invoker, MethodTable, Object};
use crate::error::{Result, ScriptError};

fn recv_str(recv: &Object) -> &str {
    match recv {
        Object::Str(s) => s.as_str(),
        Object::HtmlSafe(s) => s.as_str(),
        _ => unreachable!("string method invoked on non-string receiver"),
    }
}

/// Quoted, escaped debug form: `\\ \' \" \r \n \t` are escaped; the result
/// is always a re-parseable double-quoted literal.
pub fn inspect_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn resolve_char_index(idx: f64, char_len: usize) -> Option<usize> {
    let idx = idx.trunc() as i64;
    let idx = if idx < 0 { idx + char_len as i64 } else { idx };
    if idx < 0 || idx as usize >= char_len {
        None
    } else {
        Some(idx as usize)
    }
}

pub(super) fn el_ref(recv: &std::rc::Rc<String>, args: &[Object]) -> Result<Object> {
    let s = recv.as_str();
    let chars: Vec<char> = s.chars().collect();
    match args {
        [Object::Number(n)] => Ok(resolve_char_index(*n, chars.len())
            .map(|i| Object::string(chars[i].to_string()))
            .unwrap_or(Object::Nil)),
        [Object::Number(start), Object::Number(len)] => {
            let start_idx = resolve_char_index(*start, chars.len().max(1)).unwrap_or(chars.len());
            let take = (*len).max(0.0).trunc() as usize;
            Ok(Object::string(chars.iter().skip(start_idx).take(take).collect::<String>()))
        }
        [Object::Range(range)] => {
            let (start, end) = range.resolve_span(chars.len())?;
            Ok(Object::string(chars[start..end].iter().collect::<String>()))
        }
        [Object::Str(needle)] | [Object::HtmlSafe(needle)] => {
            Ok(if s.contains(needle.as_str()) {
                Object::string(needle.as_str())
            } else {
                Object::Nil
            })
        }
        [Object::Regexp(re)] => {
            let re = re.compiled()?;
            Ok(re.find(s).map(|m| Object::string(m.as_str())).unwrap_or(Object::Nil))
        }
        [Object::Regexp(re), Object::Number(group)] => {
            let re = re.compiled()?;
            let group = *group as usize;
            Ok(re
                .captures(s)
                .and_then(|c| c.get(group))
                .map(|m| Object::string(m.as_str()))
                .unwrap_or(Object::Nil))
        }
        [other] if !matches!(other, Object::Number(_)) => Err(ScriptError::TypeError(format!(
            "no implicit conversion from {} to index",
            other.type_name()
        ))),
        _ => Err(ScriptError::ArgumentType {
            method: "[]".to_string(),
            message: "expected an index, (start, length), Range, String, or Regexp".to_string(),
        }),
    }
}

fn m_ascii_only(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("ascii_only?", args, 0, Some(0))?;
    Ok(Object::Boolean(recv_str(recv).is_ascii()))
}

fn m_bytes(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("bytes", args, 0, Some(0))?;
    Ok(Object::array(recv_str(recv).bytes().map(|b| Object::Number(b as f64)).collect()))
}

fn m_each_byte(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("each_byte", args, 1, Some(1))?;
    for b in recv_str(recv).bytes() {
        inv.call_block(&args[0], &[Object::Number(b as f64)])?;
    }
    Ok(recv.clone())
}

fn m_byteslice(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("byteslice", args, 1, Some(2))?;
    let bytes = recv_str(recv).as_bytes();
    if let [Object::Range(range)] = args {
        let (start, end) = range.resolve_span(bytes.len())?;
        return Ok(Object::string(String::from_utf8_lossy(&bytes[start..end]).into_owned()));
    }
    let len = bytes.len() as i64;
    let start = expect_number("byteslice", &args[0])?.trunc() as i64;
    let start = if start < 0 { start + len } else { start };
    if start < 0 || start > len {
        return Ok(Object::Nil);
    }
    let take = match args.get(1) {
        Some(n) => expect_number("byteslice", n)?.trunc().max(0.0) as i64,
        None => 1,
    };
    let end = (start + take).min(len);
    let slice = &bytes[start as usize..end.max(start) as usize];
    Ok(Object::string(String::from_utf8_lossy(slice).into_owned()))
}

fn m_chars(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("chars", args, 0, Some(0))?;
    Ok(Object::array(recv_str(recv).chars().map(|c| Object::string(c.to_string())).collect()))
}

fn m_each_char(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("each_char", args, 1, Some(1))?;
    for c in recv_str(recv).chars() {
        inv.call_block(&args[0], &[Object::string(c.to_string())])?;
    }
    Ok(recv.clone())
}

fn m_chop(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("chop", args, 0, Some(0))?;
    let s = recv_str(recv);
    let mut chars: Vec<char> = s.chars().collect();
    chars.pop();
    Ok(Object::string(chars.into_iter().collect::<String>()))
}

fn m_chr(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("chr", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv).chars().next().map(|c| c.to_string()).unwrap_or_default()))
}

fn m_codepoints(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("codepoints", args, 0, Some(0))?;
    Ok(Object::array(recv_str(recv).chars().map(|c| Object::Number(c as u32 as f64)).collect()))
}

fn m_each_codepoint(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("each_codepoint", args, 1, Some(1))?;
    for c in recv_str(recv).chars() {
        inv.call_block(&args[0], &[Object::Number(c as u32 as f64)])?;
    }
    Ok(recv.clone())
}

fn m_getbyte(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("getbyte", args, 1, Some(1))?;
    let idx = expect_number("getbyte", &args[0])?.trunc() as i64;
    let bytes = recv_str(recv).as_bytes();
    let idx = if idx < 0 { idx + bytes.len() as i64 } else { idx };
    Ok(if idx >= 0 && (idx as usize) < bytes.len() {
        Object::Number(bytes[idx as usize] as f64)
    } else {
        Object::Nil
    })
}

fn m_scrub(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("scrub", args, 0, Some(1))?;
    // Our strings are always valid UTF-8 once constructed, so there is
    // nothing to replace; accept and ignore the optional replacement.
    Ok(Object::string(recv_str(recv)))
}

fn m_inspect(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("inspect", args, 0, Some(0))?;
    Ok(Object::string(inspect_str(recv_str(recv))))
}

fn m_eq(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("==", args, 1, Some(1))?;
    Ok(Object::Boolean(recv.eq_value(&args[0])))
}

fn m_cmp(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("<=>", args, 1, Some(1))?;
    match recv.cmp_value(&args[0]) {
        Ok(ord) => Ok(Object::Number(ord as i32 as f64)),
        Err(_) => Ok(Object::Nil),
    }
}

fn m_casecmp(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("casecmp", args, 1, Some(1))?;
    let other = expect_str("casecmp", &args[0])?;
    let a = recv_str(recv).to_lowercase();
    let b = other.to_lowercase();
    Ok(Object::Number(match a.cmp(&b) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    }))
}

fn m_start_with(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("start_with?", args, 1, None)?;
    let s = recv_str(recv);
    for a in args {
        if s.starts_with(expect_str("start_with?", a)?) {
            return Ok(Object::Boolean(true));
        }
    }
    Ok(Object::Boolean(false))
}

fn m_end_with(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("end_with?", args, 1, None)?;
    let s = recv_str(recv);
    for a in args {
        if s.ends_with(expect_str("end_with?", a)?) {
            return Ok(Object::Boolean(true));
        }
    }
    Ok(Object::Boolean(false))
}

fn m_include(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("include?", args, 1, Some(1))?;
    Ok(Object::Boolean(recv_str(recv).contains(expect_str("include?", &args[0])?)))
}

fn m_capitalize(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("capitalize", args, 0, Some(0))?;
    let s = recv_str(recv);
    let mut chars = s.chars();
    let out = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    };
    Ok(Object::string(out))
}

fn m_downcase(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("downcase", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv).to_lowercase()))
}

fn m_upcase(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("upcase", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv).to_uppercase()))
}

/// Leniently parses an optional `-`/`0x` prefix followed by hex digits,
/// returning `0` (not an error) for anything else — the resolved behavior
/// for this method.
fn m_hex(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("hex", args, 0, Some(0))?;
    let s = recv_str(recv).trim();
    let (neg, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let rest = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")).unwrap_or(rest);
    let hex_len = rest.chars().take_while(|c| c.is_ascii_hexdigit()).count();
    let value = i64::from_str_radix(&rest[..hex_len], 16).unwrap_or(0);
    Ok(Object::Number(if neg { -value as f64 } else { value as f64 }))
}

fn m_size(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("size", args, 0, Some(0))?;
    Ok(Object::Number(recv_str(recv).chars().count() as f64))
}

fn m_bytesize(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("bytesize", args, 0, Some(0))?;
    Ok(Object::Number(recv_str(recv).len() as f64))
}

fn m_empty(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("empty?", args, 0, Some(0))?;
    Ok(Object::Boolean(recv_str(recv).is_empty()))
}

fn m_slice(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("slice", args, 1, Some(2))?;
    match recv {
        Object::Str(s) | Object::HtmlSafe(s) => el_ref(s, args),
        _ => unreachable!(),
    }
}

fn pad(s: &str, width: usize, pad_str: &str, left: bool, right: bool) -> String {
    let char_len = s.chars().count();
    if char_len >= width || pad_str.is_empty() {
        return s.to_string();
    }
    let total_pad = width - char_len;
    let pad_chars: Vec<char> = pad_str.chars().collect();
    let build = |n: usize| -> String {
        (0..n).map(|i| pad_chars[i % pad_chars.len()]).collect()
    };
    match (left, right) {
        (true, true) => {
            let left_len = total_pad / 2;
            let right_len = total_pad - left_len;
            format!("{}{}{}", build(left_len), s, build(right_len))
        }
        (true, false) => format!("{}{}", build(total_pad), s),
        _ => format!("{}{}", s, build(total_pad)),
    }
}

fn m_center(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("center", args, 1, Some(2))?;
    let width = expect_number("center", &args[0])?.trunc();
    if width < 0.0 {
        return Err(ScriptError::InvalidArgument("negative width".to_string()));
    }
    let pad_str = match args.get(1) {
        Some(p) => expect_str("center", p)?.to_string(),
        None => " ".to_string(),
    };
    Ok(Object::string(pad(recv_str(recv), width as usize, &pad_str, true, true)))
}

fn m_ljust(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("ljust", args, 1, Some(2))?;
    let width = expect_number("ljust", &args[0])?.trunc();
    if width < 0.0 {
        return Err(ScriptError::InvalidArgument("negative width".to_string()));
    }
    let pad_str = match args.get(1) {
        Some(p) => expect_str("ljust", p)?.to_string(),
        None => " ".to_string(),
    };
    Ok(Object::string(pad(recv_str(recv), width as usize, &pad_str, false, true)))
}

fn m_rjust(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("rjust", args, 1, Some(2))?;
    let width = expect_number("rjust", &args[0])?.trunc();
    if width < 0.0 {
        return Err(ScriptError::InvalidArgument("negative width".to_string()));
    }
    let pad_str = match args.get(1) {
        Some(p) => expect_str("rjust", p)?.to_string(),
        None => " ".to_string(),
    };
    Ok(Object::string(pad(recv_str(recv), width as usize, &pad_str, true, false)))
}

fn m_chomp(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("chomp", args, 0, Some(1))?;
    let s = recv_str(recv);
    let out = match args.first() {
        None => {
            if let Some(stripped) = s.strip_suffix("\r\n") {
                stripped.to_string()
            } else if let Some(stripped) = s.strip_suffix('\n').or_else(|| s.strip_suffix('\r')) {
                stripped.to_string()
            } else {
                s.to_string()
            }
        }
        Some(sep) => {
            let sep = expect_str("chomp", sep)?;
            if sep.is_empty() {
                let mut out = s;
                while let Some(stripped) = out.strip_suffix("\r\n").or_else(|| out.strip_suffix('\n')) {
                    out = stripped;
                }
                out.to_string()
            } else if let Some(stripped) = s.strip_suffix(sep) {
                stripped.to_string()
            } else {
                s.to_string()
            }
        }
    };
    Ok(Object::string(out))
}

fn m_strip(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("strip", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv).trim()))
}

fn m_lstrip(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("lstrip", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv).trim_start()))
}

fn m_rstrip(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("rstrip", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv).trim_end()))
}

fn m_ord(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("ord", args, 0, Some(0))?;
    recv_str(recv)
        .chars()
        .next()
        .map(|c| Object::Number(c as u32 as f64))
        .ok_or_else(|| ScriptError::InvalidArgument("empty string".to_string()))
}

fn m_reverse(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("reverse", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv).chars().rev().collect::<String>()))
}

fn m_lines(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("lines", args, 0, Some(1))?;
    let s = recv_str(recv);
    let sep = match args.first() {
        Some(a) => expect_str("lines", a)?.to_string(),
        None => "\n".to_string(),
    };
    if sep.is_empty() {
        // Paragraph mode: split on runs of blank lines.
        let parts: Vec<Object> = s
            .split("\n\n")
            .filter(|p| !p.is_empty())
            .map(|p| Object::string(format!("{p}\n\n")))
            .collect();
        return Ok(Object::array(parts));
    }
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(pos) = rest.find(&sep) {
        let (line, after) = rest.split_at(pos + sep.len());
        out.push(Object::string(line));
        rest = after;
    }
    if !rest.is_empty() {
        out.push(Object::string(rest));
    }
    Ok(Object::array(out))
}

fn clamp_start(start: i64, len: usize) -> usize {
    let start = if start < 0 { start + len as i64 } else { start };
    start.clamp(0, len as i64) as usize
}

fn m_index(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("index", args, 1, Some(2))?;
    let s = recv_str(recv);
    let chars: Vec<char> = s.chars().collect();
    let start = match args.get(1) {
        Some(n) => clamp_start(expect_number("index", n)?.trunc() as i64, chars.len()),
        None => 0,
    };
    let haystack: String = chars[start..].iter().collect();
    let found = match &args[0] {
        Object::Str(needle) | Object::HtmlSafe(needle) => haystack.find(needle.as_str()).map(|byte_pos| {
            haystack[..byte_pos].chars().count() + start
        }),
        Object::Regexp(re) => re.compiled()?.find(&haystack).map(|m| {
            haystack[..m.start()].chars().count() + start
        }),
        other => {
            return Err(ScriptError::ArgumentType {
                method: "index".to_string(),
                message: format!("expected a String or Regexp, got {}", other.type_name()),
            })
        }
    };
    Ok(found.map(|i| Object::Number(i as f64)).unwrap_or(Object::Nil))
}

fn m_rindex(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("rindex", args, 1, Some(2))?;
    let s = recv_str(recv);
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let end = match args.get(1) {
        Some(n) => {
            let n = expect_number("rindex", n)?.trunc() as i64;
            let n = if n < 0 { n + len as i64 } else { n };
            if n < 0 {
                return Ok(Object::Nil);
            }
            (n as usize + 1).min(len)
        }
        None => len,
    };
    let haystack: String = chars[..end].iter().collect();
    let found = match &args[0] {
        Object::Str(needle) | Object::HtmlSafe(needle) => haystack.rfind(needle.as_str()).map(|byte_pos| haystack[..byte_pos].chars().count()),
        Object::Regexp(re) => {
            let re = re.compiled()?;
            re.find_iter(&haystack).last().map(|m| haystack[..m.start()].chars().count())
        }
        other => {
            return Err(ScriptError::ArgumentType {
                method: "rindex".to_string(),
                message: format!("expected a String or Regexp, got {}", other.type_name()),
            })
        }
    };
    Ok(found.map(|i| Object::Number(i as f64)).unwrap_or(Object::Nil))
}

fn m_match(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("match", args, 1, Some(2))?;
    let s = recv_str(recv);
    let chars: Vec<char> = s.chars().collect();
    let start = match args.get(1) {
        Some(n) => clamp_start(expect_number("match", n)?.trunc() as i64, chars.len()),
        None => 0,
    };
    let haystack: String = chars[start..].iter().collect();
    let re = match &args[0] {
        Object::Regexp(re) => re.compiled()?,
        Object::Str(pat) | Object::HtmlSafe(pat) => {
            Regex::new(pat).map_err(|e| ScriptError::InvalidArgument(format!("bad regex: {e}")))?
        }
        other => {
            return Err(ScriptError::ArgumentType {
                method: "match".to_string(),
                message: format!("expected a String or Regexp, got {}", other.type_name()),
            })
        }
    };
    Ok(match re.captures(&haystack) {
        Some(caps) => Object::array(
            caps.iter()
                .map(|m| m.map(|m| Object::string(m.as_str())).unwrap_or(Object::Nil))
                .collect(),
        ),
        None => Object::Nil,
    })
}

fn m_partition(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("partition", args, 1, Some(1))?;
    let s = recv_str(recv);
    let (before, sep, after) = match &args[0] {
        Object::Str(needle) | Object::HtmlSafe(needle) => match s.find(needle.as_str()) {
            Some(pos) => (s[..pos].to_string(), needle.as_str().to_string(), s[pos + needle.len()..].to_string()),
            None => (s.to_string(), String::new(), String::new()),
        },
        Object::Regexp(re) => {
            let re = re.compiled()?;
            match re.find(s) {
                Some(m) => (s[..m.start()].to_string(), m.as_str().to_string(), s[m.end()..].to_string()),
                None => (s.to_string(), String::new(), String::new()),
            }
        }
        other => {
            return Err(ScriptError::ArgumentType {
                method: "partition".to_string(),
                message: format!("expected a String or Regexp, got {}", other.type_name()),
            })
        }
    };
    Ok(Object::array(vec![Object::string(before), Object::string(sep), Object::string(after)]))
}

fn m_rpartition(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("rpartition", args, 1, Some(1))?;
    let s = recv_str(recv);
    let (before, sep, after) = match &args[0] {
        Object::Str(needle) | Object::HtmlSafe(needle) => match s.rfind(needle.as_str()) {
            Some(pos) => (s[..pos].to_string(), needle.as_str().to_string(), s[pos + needle.len()..].to_string()),
            None => (String::new(), String::new(), s.to_string()),
        },
        Object::Regexp(re) => {
            let re = re.compiled()?;
            match re.find_iter(s).last() {
                Some(m) => (s[..m.start()].to_string(), m.as_str().to_string(), s[m.end()..].to_string()),
                None => (String::new(), String::new(), s.to_string()),
            }
        }
        other => {
            return Err(ScriptError::ArgumentType {
                method: "rpartition".to_string(),
                message: format!("expected a String or Regexp, got {}", other.type_name()),
            })
        }
    };
    Ok(Object::array(vec![Object::string(before), Object::string(sep), Object::string(after)]))
}

/// Splits `s` into at most `limit` characters when `limit > 0`, the last
/// element holding whatever chars remain (there are no separators to lose,
/// unlike the pattern-based splits below, so "remainder" here is just
/// "everything not yet taken").
fn split_into_chars(s: &str, limit: i64) -> Vec<String> {
    if limit > 0 {
        let take = (limit as usize).saturating_sub(1);
        let mut parts = Vec::with_capacity(take + 1);
        let mut last = 0;
        for (i, (idx, ch)) in s.char_indices().enumerate() {
            if i >= take {
                break;
            }
            parts.push(ch.to_string());
            last = idx + ch.len_utf8();
        }
        parts.push(s[last..].to_string());
        parts
    } else {
        s.chars().map(String::from).collect()
    }
}

/// Leading whitespace is always stripped; runs of whitespace separate
/// fields. With a positive `limit` only the first `limit - 1` runs are
/// treated as separators — the final field is everything left in the
/// string verbatim, not re-collapsed.
fn split_whitespace_runs(s: &str, limit: i64) -> Vec<String> {
    let trimmed = s.trim_start();
    if limit > 0 {
        let take = (limit as usize).saturating_sub(1);
        let mut parts = Vec::with_capacity(take + 1);
        let mut rest = trimmed;
        for _ in 0..take {
            let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            if token_end == rest.len() {
                break;
            }
            parts.push(rest[..token_end].to_string());
            let after_ws = rest[token_end..]
                .find(|c: char| !c.is_whitespace())
                .map(|i| token_end + i)
                .unwrap_or(rest.len());
            rest = &rest[after_ws..];
        }
        parts.push(rest.to_string());
        parts
    } else {
        trimmed.split_whitespace().map(String::from).collect()
    }
}

/// Literal-string separator: `str::splitn`'s own semantics already match
/// the language's — at most `limit` fields, the last retaining every
/// further separator occurrence verbatim — so this is a thin wrapper.
fn split_on_literal(s: &str, pat: &str, limit: i64) -> Vec<String> {
    if limit > 0 {
        s.splitn(limit as usize, pat).map(String::from).collect()
    } else {
        s.split(pat).map(String::from).collect()
    }
}

fn split_on_regex(s: &str, re: &Regex, limit: i64) -> Vec<String> {
    if limit > 0 {
        let take = (limit as usize).saturating_sub(1);
        let mut parts = Vec::with_capacity(take + 1);
        let mut last = 0;
        for (count, m) in re.find_iter(s).enumerate() {
            if count >= take {
                break;
            }
            parts.push(s[last..m.start()].to_string());
            last = m.end();
        }
        parts.push(s[last..].to_string());
        parts
    } else {
        re.split(s).map(String::from).collect()
    }
}

/// Capture groups are interleaved into the result (spec.md §4.4); with a
/// positive `limit`, only the first `limit - 1` *matches* (not emitted
/// elements) count toward the cap, and the trailing push below then
/// carries the rest of the string — separators and all — as the last
/// field, same as the other pattern forms.
fn split_on_regex_with_groups(s: &str, re: &Regex, limit: i64) -> Vec<String> {
    let take = if limit > 0 { Some((limit as usize).saturating_sub(1)) } else { None };
    let mut out = Vec::new();
    let mut last = 0;
    for (count, caps) in re.captures_iter(s).enumerate() {
        if take.is_some_and(|take| count >= take) {
            break;
        }
        let m = caps.get(0).unwrap();
        out.push(s[last..m.start()].to_string());
        for i in 1..caps.len() {
            if let Some(g) = caps.get(i) {
                out.push(g.as_str().to_string());
            }
        }
        last = m.end();
    }
    out.push(s[last..].to_string());
    out
}

fn m_split(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("split", args, 0, Some(2))?;
    let s = recv_str(recv);
    let limit = match args.get(1) {
        Some(n) => expect_number("split", n)?.trunc() as i64,
        None => 0,
    };

    let mut parts: Vec<String> = match args.first() {
        None => split_whitespace_runs(s, limit),
        Some(Object::Str(pat)) | Some(Object::HtmlSafe(pat)) if pat.is_empty() => split_into_chars(s, limit),
        Some(Object::Str(pat)) | Some(Object::HtmlSafe(pat)) if pat.as_str() == " " => {
            split_whitespace_runs(s, limit)
        }
        Some(Object::Str(pat)) | Some(Object::HtmlSafe(pat)) => split_on_literal(s, pat.as_str(), limit),
        Some(Object::Regexp(re)) => {
            let re = re.compiled()?;
            if re.captures_len() > 1 {
                split_on_regex_with_groups(s, &re, limit)
            } else {
                split_on_regex(s, &re, limit)
            }
        }
        Some(other) => {
            return Err(ScriptError::ArgumentType {
                method: "split".to_string(),
                message: format!("expected a String or Regexp, got {}", other.type_name()),
            })
        }
    };

    if limit == 0 {
        while parts.last().map_or(false, |p| p.is_empty()) {
            parts.pop();
        }
    }
    Ok(Object::array(parts.into_iter().map(Object::string).collect()))
}

fn expand_template(template: &str, whole: &str, groups: &[Option<&str>]) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('0') => out.push_str(whole),
                Some(d) if d.is_ascii_digit() => {
                    let idx = d.to_digit(10).unwrap() as usize;
                    if idx >= 1 {
                        if let Some(Some(g)) = groups.get(idx - 1) {
                            out.push_str(g);
                        }
                    }
                }
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn sub_gsub(recv: &Object, args: &[Object], inv: &dyn Invoker, global: bool) -> Result<Object> {
    let method = if global { "gsub" } else { "sub" };
    check_arity(method, args, 2, Some(2))?;
    let s = recv_str(recv);
    let re = match &args[0] {
        Object::Regexp(re) => re.compiled()?,
        Object::Str(pat) | Object::HtmlSafe(pat) => {
            Regex::new(&regex::escape(pat)).map_err(|e| ScriptError::InvalidArgument(e.to_string()))?
        }
        other => {
            return Err(ScriptError::ArgumentType {
                method: method.to_string(),
                message: format!("expected a String or Regexp, got {}", other.type_name()),
            })
        }
    };

    let mut out = String::new();
    let mut last = 0;
    for caps in re.captures_iter(s) {
        let m = caps.get(0).unwrap();
        out.push_str(&s[last..m.start()]);
        let groups: Vec<Option<&str>> = (1..caps.len()).map(|i| caps.get(i).map(|g| g.as_str())).collect();
        let replacement = match &args[1] {
            Object::Str(template) | Object::HtmlSafe(template) => expand_template(template, m.as_str(), &groups),
            Object::Hash(h) => h
                .borrow()
                .get(&Object::string(m.as_str()))
                .map(Object::to_display_string)
                .unwrap_or_default(),
            Object::Proc(_) => inv.call_block(&args[1], &[Object::string(m.as_str())])?.to_display_string(),
            other => {
                return Err(ScriptError::ArgumentType {
                    method: method.to_string(),
                    message: format!("expected a String, Hash, or Proc replacement, got {}", other.type_name()),
                })
            }
        };
        out.push_str(&replacement);
        last = m.end();
        if !global {
            break;
        }
    }
    out.push_str(&s[last..]);
    Ok(Object::string(out))
}

fn m_sub(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    sub_gsub(recv, args, inv, false)
}

fn m_gsub(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    sub_gsub(recv, args, inv, true)
}

fn m_to_s(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_s", args, 0, Some(0))?;
    Ok(Object::string(recv_str(recv)))
}

/// Without a block, returns the same `Array` of lines `lines` would (there
/// is no lazy enumerator type in this object model); with one, calls it
/// once per line and returns the receiver, matching `Array#each`.
fn m_each_line(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("each_line", args, 0, Some(1))?;
    let lines = m_lines(recv, &[], inv)?;
    match args.first() {
        None => Ok(lines),
        Some(block) => {
            if let Object::Array(lines) = &lines {
                for line in lines.borrow().iter() {
                    inv.call_block(block, std::slice::from_ref(line))?;
                }
            }
            Ok(recv.clone())
        }
    }
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "String",
        &[
            ("ascii_only?", m_ascii_only as super::NativeMethod),
            ("bytes", m_bytes),
            ("each_byte", m_each_byte),
            ("byteslice", m_byteslice),
            ("chars", m_chars),
            ("each_char", m_each_char),
            ("chop", m_chop),
            ("chr", m_chr),
            ("codepoints", m_codepoints),
            ("each_codepoint", m_each_codepoint),
            ("getbyte", m_getbyte),
            ("scrub", m_scrub),
            ("inspect", m_inspect),
            ("==", m_eq),
            ("<=>", m_cmp),
            ("casecmp", m_casecmp),
            ("start_with?", m_start_with),
            ("end_with?", m_end_with),
            ("include?", m_include),
            ("capitalize", m_capitalize),
            ("downcase", m_downcase),
            ("upcase", m_upcase),
            ("hex", m_hex),
            ("size", m_size),
            ("length", m_size),
            ("bytesize", m_bytesize),
            ("empty?", m_empty),
            ("slice", m_slice),
            ("[]", m_slice),
            ("center", m_center),
            ("ljust", m_ljust),
            ("rjust", m_rjust),
            ("chomp", m_chomp),
            ("strip", m_strip),
            ("lstrip", m_lstrip),
            ("rstrip", m_rstrip),
            ("ord", m_ord),
            ("reverse", m_reverse),
            ("lines", m_lines),
            ("each_line", m_each_line),
            ("index", m_index),
            ("rindex", m_rindex),
            ("match", m_match),
            ("partition", m_partition),
            ("rpartition", m_rpartition),
            ("split", m_split),
            ("sub", m_sub),
            ("gsub", m_gsub),
            ("to_s", m_to_s),
        ],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_empty_pattern_splits_into_chars() {
        let recv = Object::string("test");
        let result = m_split(&recv, &[Object::string("")], &crate::evaluator::NullInvoker).unwrap();
        assert_eq!(result.inspect(), "[\"t\", \"e\", \"s\", \"t\"]");
    }

    #[test]
    fn partition_on_space() {
        let recv = Object::string("hello world");
        let result = m_partition(&recv, &[Object::string(" ")], &crate::evaluator::NullInvoker).unwrap();
        assert_eq!(result.inspect(), "[\"hello\", \" \", \"world\"]");
    }

    #[test]
    fn casecmp_matches_scenario() {
        let recv = Object::string("abcd");
        let r1 = m_casecmp(&recv, &[Object::string("ABCD")], &crate::evaluator::NullInvoker).unwrap();
        assert!(r1.eq_value(&Object::Number(0.0)));
        let recv2 = Object::string("aacd");
        let r2 = m_casecmp(&recv2, &[Object::string("Abcd")], &crate::evaluator::NullInvoker).unwrap();
        assert!(r2.eq_value(&Object::Number(-1.0)));
    }

    #[test]
    fn sub_with_capture_groups() {
        let recv = Object::string("test 70 100");
        let re = Object::Regexp(std::rc::Rc::new(super::super::RegexpData::new("([0-9])([0-9]*)", "")));
        let result = m_sub(&recv, &[re, Object::string("-\\1:\\2-")], &crate::evaluator::NullInvoker).unwrap();
        assert_eq!(result.inspect(), "\"test -7:0- 100\"");
    }

    #[test]
    fn rindex_clamps_to_end() {
        let recv = Object::string("hello world");
        let miss = m_rindex(&recv, &[Object::string("l"), Object::Number(-20.0)], &crate::evaluator::NullInvoker).unwrap();
        assert!(matches!(miss, Object::Nil));
        let hit = m_rindex(&recv, &[Object::string("l"), Object::Number(20.0)], &crate::evaluator::NullInvoker).unwrap();
        assert!(hit.eq_value(&Object::Number(9.0)));
    }

    #[test]
    fn split_with_positive_limit_preserves_separators_in_remainder() {
        let recv = Object::string("1,2,3,,5,");
        let result = m_split(
            &recv,
            &[Object::string(","), Object::Number(3.0)],
            &crate::evaluator::NullInvoker,
        )
        .unwrap();
        assert_eq!(result.inspect(), "[\"1\", \"2\", \"3,,5,\"]");

        let result = m_split(
            &recv,
            &[Object::string(","), Object::Number(5.0)],
            &crate::evaluator::NullInvoker,
        )
        .unwrap();
        assert_eq!(result.inspect(), "[\"1\", \"2\", \"3\", \"\", \"5,\"]");
    }

    #[test]
    fn byteslice_accepts_range_arguments() {
        let recv = Object::string("test");
        let range = |begin: f64, end: f64, exclusive: bool| {
            Object::Range(std::rc::Rc::new(super::super::RangeData::new(
                Object::Number(begin),
                Object::Number(end),
                exclusive,
            )))
        };

        let result = m_byteslice(&recv, &[range(1.0, 2.0, false)], &crate::evaluator::NullInvoker).unwrap();
        assert_eq!(result.inspect(), "\"es\"");

        let result = m_byteslice(&recv, &[range(2.0, 2.0, true)], &crate::evaluator::NullInvoker).unwrap();
        assert_eq!(result.inspect(), "\"\"");

        let result = m_byteslice(&recv, &[range(2.0, -1.0, true)], &crate::evaluator::NullInvoker).unwrap();
        assert_eq!(result.inspect(), "\"s\"");
    }
}
