//! 属性值定义
//!
//! 包含颜色和自定义属性使用的类型化属性值。

use crate::math::{Float2, Float3, Float4, Int2, Int3, Int4};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// RGBA颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 从十六进制值创建（如 0xFF0000 表示红色）
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
            a: 255,
        }
    }

    /// 转换为 `#RRGGBBAA` 字符串
    pub fn to_hex_string(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// 转换为 [0.0, 1.0] 范围的浮点数组
    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const TRANSPARENT: Color = Color::with_alpha(0, 0, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// 对象引用（以对象的持久ID表示）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef(pub i32);

/// 属性值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Str,
    Int,
    Int2,
    Int3,
    Int4,
    Float,
    Float2,
    Float3,
    Float4,
    Bool,
    Path,
    Color,
    Object,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::Str => "string",
            AttributeType::Int => "int",
            AttributeType::Int2 => "int2",
            AttributeType::Int3 => "int3",
            AttributeType::Int4 => "int4",
            AttributeType::Float => "float",
            AttributeType::Float2 => "float2",
            AttributeType::Float3 => "float3",
            AttributeType::Float4 => "float4",
            AttributeType::Bool => "bool",
            AttributeType::Path => "path",
            AttributeType::Color => "color",
            AttributeType::Object => "object",
        };
        f.write_str(name)
    }
}

/// 类型化属性值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Str(String),
    Int(i32),
    Int2(Int2),
    Int3(Int3),
    Int4(Int4),
    Float(f32),
    Float2(Float2),
    Float3(Float3),
    Float4(Float4),
    Bool(bool),
    Path(PathBuf),
    Color(Color),
    Object(ObjectRef),
}

impl Attribute {
    /// 创建指定类型的默认值
    pub fn new(attribute_type: AttributeType) -> Self {
        match attribute_type {
            AttributeType::Str => Attribute::Str(String::new()),
            AttributeType::Int => Attribute::Int(0),
            AttributeType::Int2 => Attribute::Int2(Int2::zeros()),
            AttributeType::Int3 => Attribute::Int3(Int3::zeros()),
            AttributeType::Int4 => Attribute::Int4(Int4::zeros()),
            AttributeType::Float => Attribute::Float(0.0),
            AttributeType::Float2 => Attribute::Float2(Float2::zeros()),
            AttributeType::Float3 => Attribute::Float3(Float3::zeros()),
            AttributeType::Float4 => Attribute::Float4(Float4::zeros()),
            AttributeType::Bool => Attribute::Bool(false),
            AttributeType::Path => Attribute::Path(PathBuf::new()),
            AttributeType::Color => Attribute::Color(Color::default()),
            AttributeType::Object => Attribute::Object(ObjectRef::default()),
        }
    }

    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Attribute::Str(_) => AttributeType::Str,
            Attribute::Int(_) => AttributeType::Int,
            Attribute::Int2(_) => AttributeType::Int2,
            Attribute::Int3(_) => AttributeType::Int3,
            Attribute::Int4(_) => AttributeType::Int4,
            Attribute::Float(_) => AttributeType::Float,
            Attribute::Float2(_) => AttributeType::Float2,
            Attribute::Float3(_) => AttributeType::Float3,
            Attribute::Float4(_) => AttributeType::Float4,
            Attribute::Bool(_) => AttributeType::Bool,
            Attribute::Path(_) => AttributeType::Path,
            Attribute::Color(_) => AttributeType::Color,
            Attribute::Object(_) => AttributeType::Object,
        }
    }

    /// 是否等于其类型的默认值
    pub fn has_default_value(&self) -> bool {
        *self == Attribute::new(self.attribute_type())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Attribute::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Attribute::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Attribute::Color(value) => Some(*value),
            _ => None,
        }
    }
}

impl Default for Attribute {
    fn default() -> Self {
        Attribute::Str(String::new())
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::Str(value.to_string())
    }
}

impl From<i32> for Attribute {
    fn from(value: i32) -> Self {
        Attribute::Int(value)
    }
}

impl From<f32> for Attribute {
    fn from(value: f32) -> Self {
        Attribute::Float(value)
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<Color> for Attribute {
    fn from(value: Color) -> Self {
        Attribute::Color(value)
    }
}

/// 命名属性值集合（附加组件的实例数据）
pub type AttributeBundle = BTreeMap<String, Attribute>;
