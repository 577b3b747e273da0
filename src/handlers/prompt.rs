// src/handlers/prompt.rs
// Request text sent to the assistant for each kind of comment event.
// The case numbers match the assistant's configured instructions.

use crate::classify::ClassificationRequest;

const NOT_A_PROPOSAL_RULE: &str =
    "IT IS MANDATORY THAT YOU RESPOND ONLY WITH \"NO_ACTION\" IN CASE THE COMMENT IS NOT A PROPOSAL.";

/// Case 1: a freshly posted comment
pub fn new_comment_request(body: &str) -> ClassificationRequest {
    ClassificationRequest::new(format!(
        "I NEED HELP WITH CASE (1.), CHECK IF COMMENT IS PROPOSAL AND IF TEMPLATE IS FOLLOWED AS PER INSTRUCTIONS. \
         {NOT_A_PROPOSAL_RULE} Comment content: {body}"
    ))
}

/// Case 2: an existing comment was edited
pub fn edited_comment_request(previous_body: Option<&str>, body: &str) -> ClassificationRequest {
    let previous = previous_body.unwrap_or("");
    ClassificationRequest::new(format!(
        "I NEED HELP WITH CASE (2.) WHEN A USER THAT POSTED AN INITIAL PROPOSAL OR COMMENT (UNEDITED) THEN EDITS THE COMMENT - \
         WE NEED TO CLASSIFY THE COMMENT BASED IN THE GIVEN INSTRUCTIONS AND IF TEMPLATE IS FOLLOWED AS PER INSTRUCTIONS. \
         {NOT_A_PROPOSAL_RULE} \n\nPrevious comment content: {previous}.\n\nEdited comment content: {body}"
    ))
}
