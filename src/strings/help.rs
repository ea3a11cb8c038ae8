//! # Help Text
//!
//! Displayed to the user for `help`, `commands` or a greeting.

pub const MAIN: &str = concat!(
    "**🎩 Jeeves Help**\n",
    "Just say what you want. Some examples:\n",
    "\n",
    "**🤖 Agent**\n",
    "* ask claude [question]\n",
    "* start agent in [project]\n",
    "* stop agent / agent status\n",
    "* apply the last response\n",
    "\n",
    "**📐 Builds**\n",
    "* prd: [requirements]\n",
    "* approve / pause / resume / abort the build\n",
    "* build it to completion\n",
    "* build status\n",
    "\n",
    "**🗂️ Sessions**\n",
    "* sessions\n",
    "* checkpoint [name]\n",
    "* start dev for [project] / stop dev\n",
    "* create project [name]\n",
    "\n",
    "**🏠 Homelab & Media**\n",
    "* restart [service], logs [service], containers, vpn, dns\n",
    "* search movie [title], add show [title], queue\n",
    "\n",
    "**⚡ Misc**\n",
    "* status\n",
    "* yes / no to answer a pending plan\n"
);
