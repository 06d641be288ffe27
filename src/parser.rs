// https://github.com/Geal/nom/blob/master/doc/choosing_a_combinator.md

use nom::{
    bytes::complete::take_while1,
    character::complete::{space0, space1},
    multi::separated_list0,
    IResult,
};

/// A tokenized command line: argv words plus the background flag.
///
/// Tokenization is a plain whitespace split; quoting and escaping are not
/// interpreted. A standalone `&` token is consumed as the background flag
/// and never reaches argv.
#[derive(Debug, PartialEq)]
pub(crate) struct Command<'a> {
    pub(crate) argv: Vec<&'a str>,
    pub(crate) background: bool,
}

impl<'a> Command<'a> {
    pub(crate) fn program(&self) -> Option<&'a str> {
        self.argv.first().copied()
    }
}

pub(crate) fn parse(input: &str) -> IResult<&str, Command> {
    let word = take_while1(|chr: char| !chr.is_whitespace());

    let (i, _) = space0(input)?;
    let (i, words) = separated_list0(space1, word)(i)?;
    let (i, _) = space0(i)?;

    let background = words.iter().any(|w| *w == "&");
    let argv = words.into_iter().filter(|w| *w != "&").collect();

    Ok((i, Command { argv, background }))
}
