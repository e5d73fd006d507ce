// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Parsing of Nix derivation (`.drv`) files.
//!
//! Derivations are stored on disk as a single ATerm:
//!
//! ```text
//! Derive([(outputs)],[(input_drvs)],[(input_srcs)],"platform","builder",[(args)],[(env)])
//! ```
//!
//! The parser keeps everything in declaration order so that callers can hand
//! arguments and environment back exactly as the derivation declares them.

use std::collections::{BTreeMap, BTreeSet};

use libnixstore_core::derived_path::OutputName;
use libnixstore_core::store_path::{StoreDir, StorePath};
use libnixstore_core::Derivation;

/// Errors that can occur during ATerm parsing.
#[derive(Debug, thiserror::Error)]
pub enum ATermError {
    #[error("unexpected end of input at position {0}")]
    UnexpectedEof(usize),
    #[error("at position {pos}: expected {expected}, got {got:?}")]
    Expected {
        pos: usize,
        expected: String,
        got: String,
    },
    #[error("invalid store path '{path}': {source}")]
    InvalidStorePath {
        path: String,
        #[source]
        source: libnixstore_core::store_path::StorePathError,
    },
    #[error("trailing input at position {0}")]
    Trailing(usize),
}

/// One entry of the output list, as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationOutput {
    /// Known for input-addressed and fixed-output outputs, empty otherwise.
    pub path: Option<StorePath>,
    /// `<method>:<algo>` or `<algo>` for content-addressed outputs.
    pub hash_algo: String,
    /// Base16 digest for fixed outputs, `impure` for impure ones.
    pub hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    InputAddressed,
    FixedOutput,
    Floating,
    Impure,
    Deferred,
}

impl DerivationOutput {
    pub fn kind(&self) -> OutputKind {
        if self.hash == "impure" {
            OutputKind::Impure
        } else if !self.hash_algo.is_empty() && !self.hash.is_empty() {
            OutputKind::FixedOutput
        } else if !self.hash_algo.is_empty() {
            OutputKind::Floating
        } else if self.path.is_none() {
            OutputKind::Deferred
        } else {
            OutputKind::InputAddressed
        }
    }
}

/// A derivation as read from its ATerm file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedDerivation {
    pub outputs: Vec<(OutputName, DerivationOutput)>,
    pub input_derivations: BTreeMap<StorePath, BTreeSet<OutputName>>,
    pub input_sources: BTreeSet<StorePath>,
    pub platform: String,
    pub builder: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ParsedDerivation {
    /// Flatten into a [`Derivation`], asking `resolve` for the path of every
    /// output whose path is not recorded in the file.
    pub fn into_derivation(
        self,
        mut resolve: impl FnMut(&str) -> Option<StorePath>,
    ) -> Derivation {
        let outputs = self
            .outputs
            .into_iter()
            .map(|(name, output)| {
                let path = output.path.or_else(|| resolve(&name));
                (name, path)
            })
            .collect();
        Derivation {
            outputs,
            input_derivations: self.input_derivations.into_keys().collect(),
            input_sources: self.input_sources,
            platform: self.platform,
            builder: self.builder,
            args: self.args,
            env: self.env,
        }
    }
}

/// Parse a `.drv` file whose paths live under `store_dir`.
pub fn parse(store_dir: &StoreDir, input: &str) -> Result<ParsedDerivation, ATermError> {
    let mut p = Parser::new(input);

    p.expect_str("Derive(")?;
    let outputs = p.parse_outputs(store_dir)?;
    p.expect_char(',')?;
    let input_derivations = p.parse_input_drvs(store_dir)?;
    p.expect_char(',')?;
    let input_sources = p
        .parse_list(|p| p.parse_store_path(store_dir))?
        .into_iter()
        .collect();
    p.expect_char(',')?;
    let platform = p.parse_string()?;
    p.expect_char(',')?;
    let builder = p.parse_string()?;
    p.expect_char(',')?;
    let args = p.parse_list(|p| p.parse_string())?;
    p.expect_char(',')?;
    let env = p.parse_list(|p| p.parse_pair())?;
    p.expect_char(')')?;
    if !p.remaining().trim_end().is_empty() {
        return Err(ATermError::Trailing(p.pos));
    }

    Ok(ParsedDerivation {
        outputs,
        input_derivations,
        input_sources,
        platform,
        builder,
        args,
        env,
    })
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Result<char, ATermError> {
        self.remaining()
            .chars()
            .next()
            .ok_or(ATermError::UnexpectedEof(self.pos))
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ATermError> {
        let got = self.peek()?;
        if got == expected {
            self.advance(expected.len_utf8());
            Ok(())
        } else {
            Err(ATermError::Expected {
                pos: self.pos,
                expected: format!("'{expected}'"),
                got: got.to_string(),
            })
        }
    }

    fn expect_str(&mut self, expected: &str) -> Result<(), ATermError> {
        if self.remaining().starts_with(expected) {
            self.advance(expected.len());
            Ok(())
        } else {
            let got: String = self.remaining().chars().take(expected.len()).collect();
            Err(ATermError::Expected {
                pos: self.pos,
                expected: format!("{expected:?}"),
                got,
            })
        }
    }

    fn parse_string(&mut self) -> Result<String, ATermError> {
        self.expect_char('"')?;
        let mut result = String::new();
        loop {
            let c = self.peek()?;
            self.advance(c.len_utf8());
            match c {
                '"' => return Ok(result),
                '\\' => {
                    let escaped = self.peek()?;
                    self.advance(escaped.len_utf8());
                    match escaped {
                        'n' => result.push('\n'),
                        'r' => result.push('\r'),
                        't' => result.push('\t'),
                        other => result.push(other),
                    }
                }
                other => result.push(other),
            }
        }
    }

    fn parse_list<T>(
        &mut self,
        mut parse_item: impl FnMut(&mut Self) -> Result<T, ATermError>,
    ) -> Result<Vec<T>, ATermError> {
        self.expect_char('[')?;
        let mut result = Vec::new();
        if self.peek()? == ']' {
            self.advance(1);
            return Ok(result);
        }
        loop {
            result.push(parse_item(self)?);
            match self.peek()? {
                ',' => self.advance(1),
                ']' => {
                    self.advance(1);
                    return Ok(result);
                }
                c => {
                    return Err(ATermError::Expected {
                        pos: self.pos,
                        expected: "',' or ']'".to_string(),
                        got: c.to_string(),
                    });
                }
            }
        }
    }

    fn parse_pair(&mut self) -> Result<(String, String), ATermError> {
        self.expect_char('(')?;
        let key = self.parse_string()?;
        self.expect_char(',')?;
        let value = self.parse_string()?;
        self.expect_char(')')?;
        Ok((key, value))
    }

    fn parse_store_path(&mut self, store_dir: &StoreDir) -> Result<StorePath, ATermError> {
        let path = self.parse_string()?;
        store_dir
            .parse_path(&path)
            .map_err(|source| ATermError::InvalidStorePath { path, source })
    }

    fn parse_outputs(
        &mut self,
        store_dir: &StoreDir,
    ) -> Result<Vec<(OutputName, DerivationOutput)>, ATermError> {
        self.parse_list(|p| {
            p.expect_char('(')?;
            let name = p.parse_string()?;
            p.expect_char(',')?;
            let path = p.parse_string()?;
            p.expect_char(',')?;
            let hash_algo = p.parse_string()?;
            p.expect_char(',')?;
            let hash = p.parse_string()?;
            p.expect_char(')')?;
            let path = if path.is_empty() {
                None
            } else {
                Some(
                    store_dir
                        .parse_path(&path)
                        .map_err(|source| ATermError::InvalidStorePath { path, source })?,
                )
            };
            Ok((
                name,
                DerivationOutput {
                    path,
                    hash_algo,
                    hash,
                },
            ))
        })
    }

    fn parse_input_drvs(
        &mut self,
        store_dir: &StoreDir,
    ) -> Result<BTreeMap<StorePath, BTreeSet<OutputName>>, ATermError> {
        let items = self.parse_list(|p| {
            p.expect_char('(')?;
            let drv_path = p.parse_store_path(store_dir)?;
            p.expect_char(',')?;
            let outputs: BTreeSet<OutputName> =
                p.parse_list(|p| p.parse_string())?.into_iter().collect();
            p.expect_char(')')?;
            Ok((drv_path, outputs))
        })?;
        let mut input_drvs: BTreeMap<StorePath, BTreeSet<OutputName>> = BTreeMap::new();
        for (drv_path, outputs) in items {
            input_drvs.entry(drv_path).or_default().extend(outputs);
        }
        Ok(input_drvs)
    }
}
