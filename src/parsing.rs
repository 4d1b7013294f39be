use nom::{
    character::complete::{space0, space1, u32},
    combinator::all_consuming,
    sequence::{preceded, terminated, tuple},
    IResult,
};

pub(crate) fn u32_entry(line: &str) -> IResult<&str, u32> {
    preceded(space1, u32)(line)
}

pub(crate) fn first_u32_entry(line: &str) -> IResult<&str, u32> {
    preceded(space0, u32)(line)
}

/// Exactly three whitespace-separated unsigned integers
pub(crate) fn u32_triple(line: &str) -> IResult<&str, (u32, u32, u32)> {
    all_consuming(terminated(
        tuple((first_u32_entry, u32_entry, u32_entry)),
        space0,
    ))(line)
}

/// The part of a line before any `#` comment
pub(crate) fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Whether a line only contains whitespace and comments
pub(crate) fn is_blank(line: &str) -> bool {
    strip_comment(line).trim().is_empty()
}
