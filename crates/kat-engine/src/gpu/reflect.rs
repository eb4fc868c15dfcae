//! Minimal WGSL reflection: finds `var<uniform>` declarations in group 0.
//!
//! Only what name-based uniform writes need is recognised: one binding per
//! uniform, typed `f32`, `vec2/3/4<f32>` or `mat4x4<f32>`.

/// WGSL type of a uniform binding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum UniformType {
    F32,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    fn parse(ty: &str) -> Option<Self> {
        let ty: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
        match ty.as_str() {
            "f32" => Some(Self::F32),
            "vec2<f32>" | "vec2f" => Some(Self::Vec2),
            "vec3<f32>" | "vec3f" => Some(Self::Vec3),
            "vec4<f32>" | "vec4f" => Some(Self::Vec4),
            "mat4x4<f32>" | "mat4x4f" => Some(Self::Mat4),
            _ => None,
        }
    }

    /// Number of `f32` components a write must supply.
    pub(crate) fn components(self) -> usize {
        match self {
            Self::F32 => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat4 => 16,
        }
    }

    /// Size of the backing uniform buffer, in bytes.
    pub(crate) fn buffer_size(self) -> u64 {
        match self {
            Self::Mat4 => 64,
            _ => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformDecl {
    pub name: String,
    pub binding: u32,
    pub ty: UniformType,
}

/// Scans `source` for uniform declarations, in source order.
pub(crate) fn scan_uniforms(source: &str) -> Result<Vec<UniformDecl>, String> {
    let code = strip_comments(source);
    let mut out = Vec::new();

    for decl in code.split(';') {
        let Some(var_at) = find_uniform_var(decl) else {
            continue;
        };
        let attrs = &decl[..var_at];
        let rest = decl[var_at..]
            .split_once('>')
            .map(|(_, r)| r)
            .ok_or_else(|| format!("malformed uniform declaration `{}`", decl.trim()))?;

        let (name, ty) = rest
            .split_once(':')
            .ok_or_else(|| format!("uniform declaration without type `{}`", decl.trim()))?;
        let name = name.trim().to_string();
        let ty_text = ty.trim();
        let ty = UniformType::parse(ty_text)
            .ok_or_else(|| format!("uniform `{name}` has unsupported type `{ty_text}`"))?;

        let group = attribute_value(attrs, "group")
            .ok_or_else(|| format!("uniform `{name}` is missing @group"))?;
        if group != 0 {
            return Err(format!("uniform `{name}` must be in @group(0), found @group({group})"));
        }
        let binding = attribute_value(attrs, "binding")
            .ok_or_else(|| format!("uniform `{name}` is missing @binding"))?;

        out.push(UniformDecl { name, binding, ty });
    }

    Ok(out)
}

fn find_uniform_var(decl: &str) -> Option<usize> {
    let mut search = 0;
    while let Some(found) = decl[search..].find("var") {
        let at = search + found;
        let after = decl[at + 3..].trim_start();
        if let Some(inner) = after.strip_prefix('<')
            && inner.trim_start().starts_with("uniform")
        {
            return Some(at);
        }
        search = at + 3;
    }
    None
}

fn attribute_value(attrs: &str, name: &str) -> Option<u32> {
    let needle = format!("@{name}");
    let at = attrs.find(&needle)? + needle.len();
    let rest = attrs[at..].trim_start().strip_prefix('(')?;
    let (value, _) = rest.split_once(')')?;
    value.trim().parse().ok()
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut block_depth = 0u32;

    while let Some(c) = chars.next() {
        if block_depth > 0 {
            match (c, chars.peek()) {
                ('*', Some('/')) => {
                    chars.next();
                    block_depth -= 1;
                }
                ('/', Some('*')) => {
                    chars.next();
                    block_depth += 1;
                }
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                block_depth = 1;
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
