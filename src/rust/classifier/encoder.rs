use tokenizers::Tokenizer;
use ort::session::Session;
use ndarray::Array2;
use ort::value::Tensor;
use std::collections::HashMap;

use super::error::ClassifierError;

/// Runs text through a tokenizer and an ONNX session.
///
/// The first output of the session is read as logits `[1, num_labels]`.
///
/// The session is expected to accept `input_ids` and `attention_mask`, and
/// optionally `token_type_ids` (BERT style graphs).
pub(crate) trait TextEncoder {
    /// Returns the initialized tokenizer
    fn tokenizer(&self) -> &Tokenizer;

    /// Returns the initialized ONNX session
    fn session(&self) -> &Session;

    /// Returns the maximum sequence length the model can handle
    fn max_sequence_length(&self) -> usize;

    /// Converts text into token IDs suitable for model input.
    ///
    /// Sequences longer than `max_sequence_length` are cut down, keeping the
    /// final special token so the model still sees a terminated sequence. An
    /// empty text still produces the special tokens and is valid input.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>, ClassifierError> {
        let max_length = self.max_sequence_length();
        if max_length < 2 {
            return Err(ClassifierError::ValidationError(
                format!("Max sequence length must be at least 2, got {}", max_length)
            ));
        }

        let encoding = self.tokenizer()
            .encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;
        let mut ids = encoding.get_ids().to_vec();

        if ids.len() > max_length {
            log::debug!("Truncating {} tokens to {}", ids.len(), max_length);
            let last = ids[ids.len() - 1];
            ids.truncate(max_length - 1);
            ids.push(last);
        }
        if ids.is_empty() {
            return Err(ClassifierError::TokenizerError("Tokenizer produced no tokens".into()));
        }
        Ok(ids)
    }

    /// Runs the model and returns the first output flattened, together with its shape.
    fn run_model(&self, tokens: &[u32]) -> Result<(Vec<usize>, Vec<f32>), ClassifierError> {
        let session = self.session();

        let input_array = Array2::from_shape_vec((1, tokens.len()),
            tokens.iter().map(|&x| x as i64).collect())
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input array: {}", e)))?;
        let input_dyn = input_array.into_dyn();
        let input_ids = input_dyn.as_standard_layout();

        // Single unpadded sequence: every position is a real token.
        let mask_dyn = Array2::<i64>::ones((1, tokens.len())).into_dyn();
        let attention_mask = mask_dyn.as_standard_layout();

        let type_dyn = Array2::<i64>::zeros((1, tokens.len())).into_dyn();
        let token_type_ids = type_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", Tensor::from_array(&input_ids)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input tensor: {}", e)))?);
        input_tensors.insert("attention_mask", Tensor::from_array(&attention_mask)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create mask tensor: {}", e)))?);
        if session.inputs.iter().any(|input| input.name == "token_type_ids") {
            input_tensors.insert("token_type_ids", Tensor::from_array(&token_type_ids)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create type tensor: {}", e)))?);
        }

        let outputs = session.run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e)))?;

        Ok((output_tensor.shape().to_vec(), output_tensor.iter().cloned().collect()))
    }

    /// Converts text into raw logits of a sequence classification head.
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let tokens = self.tokenize(text)?;
        let (shape, values) = self.run_model(&tokens)?;
        if shape.len() != 2 || shape[0] != 1 {
            return Err(ClassifierError::ModelError(
                format!("Expected logits of shape [1, num_labels], got {:?}", shape)
            ));
        }
        Ok(values)
    }
}

/// Checks that a session has the inputs and outputs a [`TextEncoder`] feeds and reads.
pub(crate) fn validate_session(session: &Session) -> Result<(), ClassifierError> {
    let has_input = |name: &str| session.inputs.iter().any(|input| input.name == name);
    if !has_input("input_ids") || !has_input("attention_mask") {
        let names: Vec<&str> = session.inputs.iter().map(|input| input.name.as_str()).collect();
        return Err(ClassifierError::ConversionFailure(
            format!("Model must take input_ids and attention_mask, found {:?}", names)
        ));
    }
    if session.outputs.is_empty() {
        return Err(ClassifierError::ConversionFailure(
            "Model must have at least 1 output".to_string()
        ));
    }
    Ok(())
}
