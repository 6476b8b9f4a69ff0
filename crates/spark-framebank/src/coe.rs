//! # COE 内存镜像
//!
//! 块 RAM 初始化文件的最小读写实现，用于把测试图像灌入写口，或把某个槽位的内容导出比对。
//!
//! ```text
//! ; 以分号开头的行是注释
//! memory_initialization_radix=16;
//! memory_initialization_vector=
//! 00,
//! 7F,
//! FF;
//! ```
//!
//! 只识别 `memory_initialization_radix` 与 `memory_initialization_vector` 两个键，键名大小写不敏感；
//! 缺省基数为 10。

use core::fmt::{self, Write as _};

use crate::error::FrameBankError;

const RADIX_KEY: &str = "memory_initialization_radix";
const VECTOR_KEY: &str = "memory_initialization_vector";

/// COE 数值基数。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CoeRadix {
    Binary,
    #[default]
    Decimal,
    Hex,
}

impl CoeRadix {
    pub const fn value(self) -> u32 {
        match self {
            CoeRadix::Binary => 2,
            CoeRadix::Decimal => 10,
            CoeRadix::Hex => 16,
        }
    }

    pub fn from_value(value: u32) -> Result<Self, FrameBankError> {
        match value {
            2 => Ok(CoeRadix::Binary),
            10 => Ok(CoeRadix::Decimal),
            16 => Ok(CoeRadix::Hex),
            other => Err(FrameBankError::coe(format!(
                "unsupported radix {other}, expected 2, 10 or 16"
            ))),
        }
    }

    fn write_word(self, out: &mut String, word: u32) -> fmt::Result {
        match self {
            CoeRadix::Binary => write!(out, "{word:08b}"),
            CoeRadix::Decimal => write!(out, "{word}"),
            CoeRadix::Hex => write!(out, "{word:02X}"),
        }
    }
}

impl fmt::Display for CoeRadix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// 解析后的 COE 镜像。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CoeImage {
    pub radix: CoeRadix,
    pub words: Vec<u32>,
}

impl CoeImage {
    pub fn new(radix: CoeRadix, words: Vec<u32>) -> Self {
        Self { radix, words }
    }

    /// 以字节序列构造镜像。
    pub fn from_bytes(radix: CoeRadix, bytes: &[u8]) -> Self {
        Self::new(radix, bytes.iter().map(|byte| u32::from(*byte)).collect())
    }

    /// 解析 COE 文本。
    pub fn parse(text: &str) -> Result<Self, FrameBankError> {
        let body: String = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with(';'))
            .collect::<Vec<_>>()
            .join("\n");
        if !body.trim_end().ends_with(';') {
            return Err(FrameBankError::coe("missing terminating `;`"));
        }

        let mut radix = CoeRadix::default();
        let mut words = None;
        for statement in body.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            let (key, value) = statement.split_once('=').ok_or_else(|| {
                FrameBankError::coe(format!("expected `key = value`, found `{statement}`"))
            })?;
            let key = key.trim().to_ascii_lowercase();
            match key.as_str() {
                RADIX_KEY => {
                    let value = value.trim();
                    let parsed = value.parse::<u32>().map_err(|_| {
                        FrameBankError::coe(format!("radix `{value}` is not a number"))
                    })?;
                    radix = CoeRadix::from_value(parsed)?;
                }
                VECTOR_KEY => words = Some(value.to_owned()),
                _ => return Err(FrameBankError::coe(format!("unknown key `{key}`"))),
            }
        }

        let vector = words.ok_or_else(|| FrameBankError::coe(format!("`{VECTOR_KEY}` is missing")))?;
        let words = vector
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                u32::from_str_radix(token, radix.value()).map_err(|_| {
                    FrameBankError::coe(format!("`{token}` is not a base-{radix} word"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { radix, words })
    }

    /// 转成字节序列；任何一个字宽超过 8 位即失败。
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameBankError> {
        self.words
            .iter()
            .enumerate()
            .map(|(index, word)| {
                u8::try_from(*word).map_err(|_| {
                    FrameBankError::coe(format!("word {index} ({word}) does not fit in 8 bits"))
                })
            })
            .collect()
    }

    /// 渲染为 COE 文本，`comments` 逐行写成文件头注释。
    pub fn render(&self, comments: &[&str]) -> String {
        let mut out = String::new();
        // 写入 String 不会失败。
        let _ = self.render_into(&mut out, comments);
        out
    }

    fn render_into(&self, out: &mut String, comments: &[&str]) -> fmt::Result {
        for comment in comments {
            writeln!(out, "; {comment}")?;
        }
        writeln!(out, "{RADIX_KEY}={};", self.radix)?;
        if self.words.is_empty() {
            return writeln!(out, "{VECTOR_KEY}=;");
        }
        writeln!(out, "{VECTOR_KEY}=")?;
        let last = self.words.len() - 1;
        for (index, word) in self.words.iter().enumerate() {
            self.radix.write_word(out, *word)?;
            out.push(if index == last { ';' } else { ',' });
            out.push('\n');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_vector_with_comments() {
        let image = CoeImage::parse(
            "; COE file for Vivado Block RAM\n\
             ; Resolution: 2x2\n\
             memory_initialization_radix=16;\n\
             memory_initialization_vector=\n\
             00,\n\
             1f,\n\
             80,\n\
             FF;\n",
        )
        .expect("合法 COE");
        assert_eq!(image.radix, CoeRadix::Hex);
        assert_eq!(image.words, vec![0x00, 0x1F, 0x80, 0xFF]);
        assert_eq!(image.to_bytes(), Ok(vec![0x00, 0x1F, 0x80, 0xFF]));
    }

    #[test]
    fn radix_defaults_to_decimal() {
        let image = CoeImage::parse("MEMORY_INITIALIZATION_VECTOR = 1 2, 3;").expect("合法 COE");
        assert_eq!(image.radix, CoeRadix::Decimal);
        assert_eq!(image.words, vec![1, 2, 3]);
    }

    #[test]
    fn wide_words_cannot_become_bytes() {
        let image = CoeImage::parse("memory_initialization_radix=16;\nmemory_initialization_vector=FFA,01;")
            .expect("12 位像素可以解析");
        let err = image.to_bytes().expect_err("超过 8 位应失败");
        assert!(err.to_string().contains("word 0"), "{err}");
    }

    #[test]
    fn rejects_unsupported_radix_and_garbage() {
        assert!(CoeImage::parse("memory_initialization_radix=8;\nmemory_initialization_vector=1;").is_err());
        assert!(CoeImage::parse("memory_initialization_radix=2;\nmemory_initialization_vector=102;").is_err());
        assert!(CoeImage::parse("memory_initialization_radix=16;").is_err());
        assert!(CoeImage::parse("memory_initialization_vector=1,2").is_err());
    }

    #[test]
    fn render_terminates_last_word_with_semicolon() {
        let image = CoeImage::from_bytes(CoeRadix::Binary, &[5, 255]);
        let text = image.render(&["pool A slot#0"]);
        assert_eq!(
            text,
            "; pool A slot#0\n\
             memory_initialization_radix=2;\n\
             memory_initialization_vector=\n\
             00000101,\n\
             11111111;\n"
        );
        assert_eq!(CoeImage::parse(&text), Ok(image));
    }
}
