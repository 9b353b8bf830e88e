use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const HARDHAT_CONFIG: &str = include_str!("../templates/hardhat/hardhat.config.js");

/// Project kinds that get a starter layout written into their workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Hardhat,
}

impl ProjectKind {
    /// Picks a project kind from the launch command. Anything unrecognized
    /// gets no scaffolding.
    pub fn detect(command: &str) -> Option<Self> {
        match command {
            "hardhat" => Some(ProjectKind::Hardhat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Hardhat => "hardhat",
        }
    }

    pub(crate) fn bundle(self, params: &ScaffoldParams) -> TemplateBundle {
        match self {
            ProjectKind::Hardhat => hardhat_bundle(params),
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ScaffoldParams {
    pub name: String,
}

impl ScaffoldParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// App name reduced to something usable as a Solidity identifier.
    pub fn contract_ident(&self) -> String {
        let ident: String = self
            .name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match ident.chars().next() {
            None => "App".to_string(),
            Some(first) if first.is_ascii_digit() => format!("App{ident}"),
            Some(_) => ident,
        }
    }

    pub fn token_symbol(&self) -> String {
        self.name.chars().take(3).collect::<String>().to_uppercase()
    }
}

#[derive(Debug, Default)]
pub(crate) struct TemplateBundle {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<(PathBuf, String)>,
}

fn hardhat_bundle(params: &ScaffoldParams) -> TemplateBundle {
    let ident = params.contract_ident();
    TemplateBundle {
        dirs: vec!["contracts".into(), "scripts".into(), "test".into()],
        files: vec![
            ("hardhat.config.js".into(), HARDHAT_CONFIG.to_string()),
            (
                PathBuf::from("contracts").join(format!("{ident}Token.sol")),
                render_token_contract(&ident, &params.name, &params.token_symbol()),
            ),
            (
                PathBuf::from("scripts").join("deploy.js"),
                render_deploy_script(&ident),
            ),
        ],
    }
}

fn render_token_contract(ident: &str, token_name: &str, symbol: &str) -> String {
    let token_name = token_name.replace('\\', "\\\\").replace('"', "\\\"");
    let symbol = symbol.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.20;

import "@openzeppelin/contracts/token/ERC20/ERC20.sol";

contract {ident}Token is ERC20 {{
    constructor() ERC20("{token_name}", "{symbol}") {{
        _mint(msg.sender, 1000000 * 10 ** decimals());
    }}
}}
"#
    )
}

fn render_deploy_script(ident: &str) -> String {
    format!(
        r#"const {{ ethers }} = require("hardhat");

async function main() {{
  const [deployer] = await ethers.getSigners();
  console.log("Deploying contracts with account:", deployer.address);

  const token = await ethers.deployContract("{ident}Token");
  await token.waitForDeployment();

  console.log("Token deployed to:", await token.getAddress());
}}

main()
  .then(() => process.exit(0))
  .catch((error) => {{
    console.error(error);
    process.exit(1);
  }});
"#
    )
}
