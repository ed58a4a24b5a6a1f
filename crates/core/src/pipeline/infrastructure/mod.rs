pub mod emotion_recognizer;
